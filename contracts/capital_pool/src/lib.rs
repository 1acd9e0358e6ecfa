#![no_std]

mod error;
mod events;
mod shares;
mod storage;

#[cfg(test)]
mod test;

pub use error::Error;
use events::*;
pub use storage::SystemLedger;
use storage::{DataKey, DEFAULT_NOTICE_PERIOD};

use capital_interfaces::math::mul_div;
use capital_interfaces::{
    BackstopClient, PayoutData, RealizedLoss, ReentrancyGuard, RiskManagerHooksClient,
    UnderwriterAccount, WithdrawalRequest, YieldAdapterClient,
};
use soroban_sdk::{contract, contractimpl, log, token, vec, Address, Env, Symbol, Vec};

/// Shared NAV ledger for underwriter capital.
///
/// Deposits mint shares against the system value, capital sits in yield
/// adapters, and the risk manager charges realized claim losses back to
/// individual accounts.
#[contract]
pub struct CapitalPool;

#[contractimpl]
impl CapitalPool {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the capital pool
    ///
    /// # Errors
    /// - `AlreadyInitialized`: Contract already initialized
    pub fn initialize(
        env: Env,
        admin: Address,
        underlying_asset: Address,
        notice_period: u64,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Initialized) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Initialized, &true);
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::UnderlyingAsset, &underlying_asset);
        env.storage()
            .instance()
            .set(&DataKey::NoticePeriod, &notice_period);
        env.storage()
            .instance()
            .set(&DataKey::Ledger, &SystemLedger::default());
        env.storage()
            .instance()
            .set(&DataKey::ActiveAdapters, &Vec::<Address>::new(&env));

        Ok(())
    }

    /// Bind the risk manager. Can only happen once.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `RiskManagerAlreadySet`: Already bound
    pub fn set_risk_manager(env: Env, risk_manager: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;

        if env.storage().instance().has(&DataKey::RiskManager) {
            return Err(Error::RiskManagerAlreadySet);
        }
        env.storage()
            .instance()
            .set(&DataKey::RiskManager, &risk_manager);
        Ok(())
    }

    pub fn set_backstop_pool(env: Env, backstop: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        env.storage()
            .instance()
            .set(&DataKey::BackstopPool, &backstop);
        Ok(())
    }

    pub fn set_notice_period(env: Env, notice_period: u64) -> Result<(), Error> {
        Self::require_admin(&env)?;
        env.storage()
            .instance()
            .set(&DataKey::NoticePeriod, &notice_period);
        Ok(())
    }

    /// Register the adapter serving a yield choice
    ///
    /// A replaced adapter stays in the active set while it still holds funds.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `AdapterAssetMismatch`: Adapter manages a different token
    pub fn set_base_yield_adapter(
        env: Env,
        yield_choice: u32,
        adapter: Address,
    ) -> Result<(), Error> {
        Self::require_admin(&env)?;

        let underlying = Self::underlying(&env)?;
        if YieldAdapterClient::new(&env, &adapter).underlying_asset() != underlying {
            return Err(Error::AdapterAssetMismatch);
        }

        env.storage()
            .instance()
            .set(&DataKey::BaseYieldAdapter(yield_choice), &adapter);

        let mut active = Self::active_adapters(env.clone());
        if !active.contains(&adapter) {
            active.push_back(adapter.clone());
            env.storage()
                .instance()
                .set(&DataKey::ActiveAdapters, &active);
        }

        env.events().publish(
            (Symbol::new(&env, "adapter_set"), yield_choice),
            AdapterSetEvent {
                yield_choice,
                adapter,
            },
        );
        Ok(())
    }

    // ============================================
    // DEPOSITS
    // ============================================

    /// Deposit underlying and mint NAV shares
    ///
    /// Funds move underwriter → pool → adapter. The risk manager is notified
    /// last and may report losses it realized, which are applied before
    /// returning.
    ///
    /// # Errors
    /// - `InvalidAmount`: amount must be positive
    /// - `AdapterNotConfigured`: No adapter for `yield_choice`
    /// - `InvalidState`: Account already uses another yield choice
    /// - `NoSharesToMint`: Deposit too small at the current NAV
    /// - `InvariantViolation`: Shares outstanding with zero value
    /// - `RiskManagerNotSet`: No risk manager bound
    pub fn deposit(
        env: Env,
        underwriter: Address,
        amount: i128,
        yield_choice: u32,
    ) -> Result<i128, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let base_adapter: Address = env
            .storage()
            .instance()
            .get(&DataKey::BaseYieldAdapter(yield_choice))
            .ok_or(Error::AdapterNotConfigured)?;
        let risk_manager = Self::risk_manager_address(&env)?;

        // An account keeps its adapter until fully withdrawn
        let existing = Self::load_account(&env, &underwriter);
        let adapter = match &existing {
            Some(account) if account.yield_choice != yield_choice => {
                return Err(Error::InvalidState);
            }
            Some(account) => account.adapter.clone(),
            None => base_adapter,
        };

        let mut ledger = Self::get_system_ledger(env.clone());
        if ledger.total_system_shares > 0 && ledger.total_system_value <= 0 {
            return Err(Error::InvariantViolation);
        }
        let minted = shares::value_to_shares(
            amount,
            ledger.total_system_value,
            ledger.total_system_shares,
        )
        .ok_or(Error::Overflow)?;
        if minted <= 0 {
            return Err(Error::NoSharesToMint);
        }

        let this = env.current_contract_address();
        let token_client = token::Client::new(&env, &Self::underlying(&env)?);
        token_client.transfer(&underwriter, &this, &amount);
        token_client.transfer(&this, &adapter, &amount);
        YieldAdapterClient::new(&env, &adapter).deposit(&amount);

        let mut account = existing.unwrap_or(UnderwriterAccount {
            principal: 0,
            shares: 0,
            yield_choice,
            adapter,
            withdrawal_requests: Vec::new(&env),
        });
        account.principal = account
            .principal
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        account.shares = account
            .shares
            .checked_add(minted)
            .ok_or(Error::Overflow)?;
        ledger.total_system_value = ledger
            .total_system_value
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        ledger.total_system_shares = ledger
            .total_system_shares
            .checked_add(minted)
            .ok_or(Error::Overflow)?;

        env.events().publish(
            (Symbol::new(&env, "deposit"), underwriter.clone()),
            DepositEvent {
                underwriter: underwriter.clone(),
                amount,
                shares_minted: minted,
                yield_choice,
            },
        );

        let realized = RiskManagerHooksClient::new(&env, &risk_manager)
            .on_capital_deposited(&this, &underwriter, &amount);
        let wiped = Self::settle_realized(&env, &underwriter, &mut account, &mut ledger, &realized)?;

        if !wiped {
            Self::store_account(&env, &underwriter, &account);
        }
        Self::save_ledger(&env, &ledger);

        Ok(minted)
    }

    // ============================================
    // WITHDRAWALS
    // ============================================

    /// Queue a withdrawal of `shares`; returns the request index
    ///
    /// # Errors
    /// - `InvalidAmount`: shares must be positive
    /// - `NoActiveDeposit`: Underwriter has no deposit
    /// - `InsufficientShares`: Exceeds shares not already requested
    pub fn request_withdrawal(env: Env, underwriter: Address, shares: i128) -> Result<u32, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        if shares <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut account =
            Self::load_account(&env, &underwriter).ok_or(Error::NoActiveDeposit)?;

        let mut requested: i128 = 0;
        for request in account.withdrawal_requests.iter() {
            requested += request.shares;
        }
        if shares > account.shares - requested {
            return Err(Error::InsufficientShares);
        }

        let principal_component =
            mul_div(account.principal, shares, account.shares).ok_or(Error::Overflow)?;

        let reservations = RiskManagerHooksClient::new(&env, &Self::risk_manager_address(&env)?)
            .on_withdrawal_requested(
                &env.current_contract_address(),
                &underwriter,
                &principal_component,
            );

        let requested_at = env.ledger().timestamp();
        account.withdrawal_requests.push_back(WithdrawalRequest {
            shares,
            principal_component,
            reservations,
            requested_at,
        });
        let index = account.withdrawal_requests.len() - 1;
        Self::store_account(&env, &underwriter, &account);

        env.events().publish(
            (Symbol::new(&env, "withdrawal_requested"), underwriter.clone()),
            WithdrawalRequestedEvent {
                underwriter,
                index,
                shares,
                principal_component,
                requested_at,
            },
        );

        Ok(index)
    }

    /// Drop a pending request. Later requests shift down one index.
    ///
    /// # Errors
    /// - `NoActiveDeposit`: Underwriter has no deposit
    /// - `NoWithdrawalRequest`: No request at `index`
    pub fn cancel_withdrawal_request(env: Env, underwriter: Address, index: u32) -> Result<(), Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let mut account =
            Self::load_account(&env, &underwriter).ok_or(Error::NoActiveDeposit)?;
        let request = account
            .withdrawal_requests
            .get(index)
            .ok_or(Error::NoWithdrawalRequest)?;
        account.withdrawal_requests.remove(index);

        RiskManagerHooksClient::new(&env, &Self::risk_manager_address(&env)?)
            .on_withdrawal_cancelled(
                &env.current_contract_address(),
                &underwriter,
                &request.reservations,
            );

        Self::store_account(&env, &underwriter, &account);

        env.events().publish(
            (Symbol::new(&env, "withdrawal_cancelled"), underwriter.clone()),
            WithdrawalCancelledEvent {
                underwriter,
                index,
                shares: request.shares,
            },
        );
        Ok(())
    }

    /// Redeem a matured request at the current NAV
    ///
    /// Pending losses are realized first. If they burned shares the request
    /// relied on, the withdrawal fails and the request has to be cancelled.
    ///
    /// # Errors
    /// - `NoWithdrawalRequest`: No request at `index`
    /// - `NoticePeriodActive`: Notice period has not elapsed
    /// - `InconsistentState`: Request exceeds shares left after losses
    /// - `InsufficientFunds`: Adapter could not pay the full value
    pub fn execute_withdrawal(env: Env, underwriter: Address, index: u32) -> Result<i128, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let mut account =
            Self::load_account(&env, &underwriter).ok_or(Error::NoWithdrawalRequest)?;
        let request = account
            .withdrawal_requests
            .get(index)
            .ok_or(Error::NoWithdrawalRequest)?;

        let now = env.ledger().timestamp();
        if now < request.requested_at.saturating_add(Self::notice_period(env.clone())) {
            return Err(Error::NoticePeriodActive);
        }

        let this = env.current_contract_address();
        let hooks = RiskManagerHooksClient::new(&env, &Self::risk_manager_address(&env)?);
        let mut ledger = Self::get_system_ledger(env.clone());

        let realized = hooks.on_withdrawal_executing(&this, &underwriter);
        if Self::settle_realized(&env, &underwriter, &mut account, &mut ledger, &realized)? {
            return Err(Error::InconsistentState);
        }
        if request.shares > account.shares {
            return Err(Error::InconsistentState);
        }

        let value = shares::shares_to_value(
            request.shares,
            ledger.total_system_value,
            ledger.total_system_shares,
        )
        .ok_or(Error::Overflow)?;
        let is_full = request.shares == account.shares;
        let principal_removed = if is_full {
            account.principal
        } else {
            mul_div(account.principal, request.shares, account.shares).ok_or(Error::Overflow)?
        };

        account.principal -= principal_removed;
        account.shares -= request.shares;
        account.withdrawal_requests.remove(index);

        ledger.total_system_value = (ledger.total_system_value - value).max(0);
        ledger.total_system_shares -= request.shares;
        if ledger.total_system_shares == 0 {
            ledger.total_system_value = 0;
        }

        if is_full {
            Self::remove_account(&env, &underwriter);
        } else {
            Self::store_account(&env, &underwriter, &account);
        }
        Self::save_ledger(&env, &ledger);

        if value > 0 {
            let paid = YieldAdapterClient::new(&env, &account.adapter).try_withdraw(&value, &underwriter);
            match paid {
                Ok(Ok(sent)) if sent >= value => {}
                _ => return Err(Error::InsufficientFunds),
            }
        }

        hooks.on_capital_withdrawn(
            &this,
            &underwriter,
            &principal_removed,
            &request.reservations,
            &is_full,
        );

        env.events().publish(
            (Symbol::new(&env, "withdrawal_executed"), underwriter.clone()),
            WithdrawalExecutedEvent {
                underwriter,
                value,
                shares_burned: request.shares,
                principal_removed,
            },
        );

        Ok(value)
    }

    // ============================================
    // LOSSES & PAYOUTS (RISK MANAGER ONLY)
    // ============================================

    /// Charge a realized loss to an underwriter
    ///
    /// Burns shares worth the applied loss so other holders keep their share
    /// price. Losing the whole principal wipes the account.
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidAmount`: loss must be positive
    /// - `NoActiveDeposit`: Account does not exist (or was already wiped)
    pub fn apply_losses(env: Env, caller: Address, underwriter: Address, loss: i128) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        if loss <= 0 {
            return Err(Error::InvalidAmount);
        }
        let mut account =
            Self::load_account(&env, &underwriter).ok_or(Error::NoActiveDeposit)?;
        let mut ledger = Self::get_system_ledger(env.clone());

        let wiped = Self::apply_loss_to_account(&env, &underwriter, &mut account, &mut ledger, loss)?;
        if !wiped {
            Self::store_account(&env, &underwriter, &account);
        }
        Self::save_ledger(&env, &ledger);
        Ok(())
    }

    /// Drop claim money that no remaining pledge can be charged for
    ///
    /// Lowers system value and the unrealized-loss receivable together, so
    /// the shortfall is shared by every shareholder through the NAV.
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidAmount`: amount must be positive
    pub fn write_off_losses(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let mut ledger = Self::get_system_ledger(env.clone());
        Self::write_off(&env, &mut ledger, amount);
        Self::save_ledger(&env, &ledger);
        Ok(())
    }

    /// Pay a claim out of the adapters backing a pool; returns the amount
    /// collected from adapters
    ///
    /// Each adapter is asked for its pro-rata part. A failing `withdraw`
    /// falls back to `emergency_transfer`; whatever is still missing is drawn
    /// from the backstop in one call. Either the full amount is paid or the
    /// call fails. Only the adapter part is owed by underwriters.
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `PayoutExceedsPoolCapital`: Payout larger than pool capital
    /// - `InvalidPayoutData`: Adapter and capital lists differ in length
    /// - `InsufficientFundsGathered`: Adapters and backstop fell short
    pub fn execute_payout(env: Env, caller: Address, payout: PayoutData) -> Result<i128, Error> {
        Self::require_risk_manager(&env, &caller)?;
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        if payout.claimant_amount < 0 || payout.fee_amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let target = payout
            .claimant_amount
            .checked_add(payout.fee_amount)
            .ok_or(Error::Overflow)?;
        if target > payout.total_capital_from_pool_lps {
            return Err(Error::PayoutExceedsPoolCapital);
        }
        if payout.adapters.len() != payout.capital_per_adapter.len() {
            return Err(Error::InvalidPayoutData);
        }

        let this = env.current_contract_address();
        let token_client = token::Client::new(&env, &Self::underlying(&env)?);
        let start_balance = token_client.balance(&this);

        let mut total_weight: i128 = 0;
        for capital in payout.capital_per_adapter.iter() {
            total_weight = total_weight
                .checked_add(capital.max(0))
                .ok_or(Error::Overflow)?;
        }

        if total_weight > 0 {
            let mut cumulative: i128 = 0;
            let mut taken: i128 = 0;
            for (adapter, capital) in payout.adapters.iter().zip(payout.capital_per_adapter.iter()) {
                cumulative += capital.max(0);
                let due = shares::cumulative_share(target, cumulative, total_weight)
                    .ok_or(Error::Overflow)?;
                let share = due - taken;
                taken = due;
                if share <= 0 {
                    continue;
                }
                Self::gather_from_adapter(&env, &adapter, share);
            }
        }

        let from_adapters = (token_client.balance(&this) - start_balance).min(target);
        let shortfall = target - from_adapters;
        if shortfall > 0 {
            if let Some(backstop) = Self::backstop_pool(env.clone()) {
                let drawn = BackstopClient::new(&env, &backstop).try_draw_fund(&shortfall, &this);
                if !matches!(drawn, Ok(Ok(_))) {
                    Self::adapter_call_failed(&env, &backstop, "draw_fund");
                }
            }
        }

        let gathered = token_client.balance(&this) - start_balance;
        if gathered < target {
            return Err(Error::InsufficientFundsGathered);
        }

        if payout.claimant_amount > 0 {
            token_client.transfer(&this, &payout.claimant, &payout.claimant_amount);
        }
        if payout.fee_amount > 0 {
            token_client.transfer(&this, &payout.fee_recipient, &payout.fee_amount);
        }

        let mut ledger = Self::get_system_ledger(env.clone());
        ledger.unrealized_losses = ledger
            .unrealized_losses
            .checked_add(from_adapters)
            .ok_or(Error::Overflow)?;
        Self::save_ledger(&env, &ledger);

        env.events().publish(
            (Symbol::new(&env, "payout_executed"), payout.claimant.clone()),
            PayoutExecutedEvent {
                claimant: payout.claimant,
                claimant_amount: payout.claimant_amount,
                fee_amount: payout.fee_amount,
                from_adapters,
                from_backstop: gathered - from_adapters,
            },
        );

        Ok(from_adapters)
    }

    // ============================================
    // NAV SYNC
    // ============================================

    /// Recompute system value from adapter holdings
    ///
    /// An adapter that fails to report is counted as zero. Callable by anyone.
    pub fn sync_system_value(env: Env) -> Result<i128, Error> {
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let mut total: i128 = 0;
        for adapter in Self::active_adapters(env.clone()).iter() {
            match YieldAdapterClient::new(&env, &adapter).try_current_value_held() {
                Ok(Ok(value)) => {
                    total = total.checked_add(value.max(0)).ok_or(Error::Overflow)?;
                }
                _ => Self::adapter_call_failed(&env, &adapter, "current_value_held"),
            }
        }

        let this = env.current_contract_address();
        let idle = token::Client::new(&env, &Self::underlying(&env)?).balance(&this);
        let mut ledger = Self::get_system_ledger(env.clone());
        total = total
            .checked_add(idle)
            .and_then(|v| v.checked_add(ledger.unrealized_losses))
            .ok_or(Error::Overflow)?;

        if ledger.total_system_shares == 0 {
            total = 0;
        }

        let old_value = ledger.total_system_value;
        ledger.total_system_value = total;
        Self::save_ledger(&env, &ledger);

        env.events().publish(
            (Symbol::new(&env, "system_value_synced"),),
            SystemValueSyncedEvent {
                new_value: total,
                old_value,
            },
        );

        Ok(total)
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    pub fn get_underwriter_account(env: Env, underwriter: Address) -> Option<UnderwriterAccount> {
        Self::load_account(&env, &underwriter)
    }

    /// Value of `shares` at the current NAV
    pub fn shares_to_value(env: Env, shares: i128) -> Result<i128, Error> {
        let ledger = Self::get_system_ledger(env);
        shares::shares_to_value(shares, ledger.total_system_value, ledger.total_system_shares)
            .ok_or(Error::Overflow)
    }

    /// Shares minted for `value` at the current NAV
    ///
    /// # Errors
    /// - `InvariantViolation`: Shares outstanding with zero value
    pub fn value_to_shares(env: Env, value: i128) -> Result<i128, Error> {
        let ledger = Self::get_system_ledger(env);
        shares::value_to_shares(value, ledger.total_system_value, ledger.total_system_shares)
            .ok_or(Error::InvariantViolation)
    }

    pub fn total_system_value(env: Env) -> i128 {
        Self::get_system_ledger(env).total_system_value
    }

    pub fn total_system_shares(env: Env) -> i128 {
        Self::get_system_ledger(env).total_system_shares
    }

    pub fn get_system_ledger(env: Env) -> SystemLedger {
        env.storage()
            .instance()
            .get(&DataKey::Ledger)
            .unwrap_or_default()
    }

    pub fn active_adapters(env: Env) -> Vec<Address> {
        env.storage()
            .instance()
            .get(&DataKey::ActiveAdapters)
            .unwrap_or(vec![&env])
    }

    pub fn base_yield_adapter(env: Env, yield_choice: u32) -> Option<Address> {
        env.storage()
            .instance()
            .get(&DataKey::BaseYieldAdapter(yield_choice))
    }

    pub fn underlying_asset(env: Env) -> Result<Address, Error> {
        Self::underlying(&env)
    }

    pub fn notice_period(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::NoticePeriod)
            .unwrap_or(DEFAULT_NOTICE_PERIOD)
    }

    pub fn risk_manager(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::RiskManager)
    }

    pub fn backstop_pool(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::BackstopPool)
    }

    // ============================================
    // INTERNAL HELPERS
    // ============================================

    /// Returns true when the account was wiped out and removed
    fn apply_loss_to_account(
        env: &Env,
        underwriter: &Address,
        account: &mut UnderwriterAccount,
        ledger: &mut SystemLedger,
        loss: i128,
    ) -> Result<bool, Error> {
        let applied = loss.min(account.principal);
        let burned = if applied == account.principal {
            account.shares
        } else {
            shares::value_to_shares(applied, ledger.total_system_value, ledger.total_system_shares)
                .ok_or(Error::InvariantViolation)?
                .min(account.shares)
        };
        // Written-off losses can leave principal with no shares behind it
        let wiped_out = burned == account.shares;

        account.principal -= applied;
        account.shares -= burned;
        if wiped_out {
            account.principal = 0;
        }

        ledger.total_system_value = (ledger.total_system_value - applied).max(0);
        ledger.total_system_shares -= burned;
        ledger.unrealized_losses = (ledger.unrealized_losses - applied).max(0);
        if ledger.total_system_shares == 0 {
            ledger.total_system_value = 0;
        }

        if wiped_out {
            Self::remove_account(env, underwriter);
        }

        env.events().publish(
            (Symbol::new(env, "losses_applied"), underwriter.clone()),
            LossesAppliedEvent {
                underwriter: underwriter.clone(),
                applied,
                shares_burned: burned,
                wiped_out,
            },
        );

        Ok(wiped_out)
    }

    /// Remove paid-out value from NAV without charging an account
    fn write_off(env: &Env, ledger: &mut SystemLedger, amount: i128) {
        if amount <= 0 {
            return;
        }
        let written = amount.min(ledger.unrealized_losses);
        ledger.unrealized_losses -= written;
        ledger.total_system_value = (ledger.total_system_value - written).max(0);

        env.events().publish(
            (Symbol::new(env, "losses_written_off"),),
            LossesWrittenOffEvent {
                amount: written,
                new_value: ledger.total_system_value,
            },
        );
    }

    /// Apply a realization reported by the risk manager; returns true when
    /// the account was wiped out
    fn settle_realized(
        env: &Env,
        underwriter: &Address,
        account: &mut UnderwriterAccount,
        ledger: &mut SystemLedger,
        realized: &RealizedLoss,
    ) -> Result<bool, Error> {
        let mut wiped = false;
        if realized.charged > 0 {
            wiped = Self::apply_loss_to_account(env, underwriter, account, ledger, realized.charged)?;
        }
        Self::write_off(env, ledger, realized.written_off);
        Ok(wiped)
    }

    fn gather_from_adapter(env: &Env, adapter: &Address, amount: i128) {
        let this = env.current_contract_address();
        let client = YieldAdapterClient::new(env, adapter);

        if matches!(client.try_withdraw(&amount, &this), Ok(Ok(_))) {
            return;
        }
        Self::adapter_call_failed(env, adapter, "withdraw");

        if !matches!(client.try_emergency_transfer(&this, &amount), Ok(Ok(_))) {
            Self::adapter_call_failed(env, adapter, "emergency_transfer");
        }
    }

    fn adapter_call_failed(env: &Env, adapter: &Address, function: &str) {
        let function = Symbol::new(env, function);
        log!(env, "adapter call failed", adapter.clone(), function.clone());
        env.events().publish(
            (Symbol::new(env, "adapter_call_failed"), adapter.clone()),
            AdapterCallFailedEvent {
                adapter: adapter.clone(),
                function,
            },
        );
    }

    fn require_admin(env: &Env) -> Result<(), Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)?;
        admin.require_auth();
        Ok(())
    }

    fn require_risk_manager(env: &Env, caller: &Address) -> Result<(), Error> {
        let risk_manager = Self::risk_manager_address(env)?;
        if *caller != risk_manager {
            return Err(Error::NotRiskManager);
        }
        caller.require_auth();
        Ok(())
    }

    fn risk_manager_address(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::RiskManager)
            .ok_or(Error::RiskManagerNotSet)
    }

    fn underlying(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::UnderlyingAsset)
            .ok_or(Error::NotInitialized)
    }

    fn save_ledger(env: &Env, ledger: &SystemLedger) {
        env.storage().instance().set(&DataKey::Ledger, ledger);
    }

    fn load_account(env: &Env, underwriter: &Address) -> Option<UnderwriterAccount> {
        env.storage()
            .persistent()
            .get(&DataKey::Account(underwriter.clone()))
    }

    fn store_account(env: &Env, underwriter: &Address, account: &UnderwriterAccount) {
        env.storage()
            .persistent()
            .set(&DataKey::Account(underwriter.clone()), account);
    }

    fn remove_account(env: &Env, underwriter: &Address) {
        env.storage()
            .persistent()
            .remove(&DataKey::Account(underwriter.clone()));
    }
}

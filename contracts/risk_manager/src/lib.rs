#![no_std]

mod error;
mod events;
mod positions;
mod premium;
mod storage;


pub use error::Error;
use events::*;
pub use storage::{DeallocationRequest, PendingRewards, PoolAccrual, PoolPosition, UnderwriterInfo};
use storage::{DataKey, Storage, DEFAULT_CLAIM_FEE_BPS, DEFAULT_MAX_ALLOCATIONS, MAX_CLAIM_FEE_BPS};

use capital_interfaces::math::per_pledge;
use capital_interfaces::{
    BackstopClient, PayoutData, PolicyBookClient, PolicyRecord, PoolData, RateCurve,
    RealizedLoss, ReentrancyGuard,
};
use soroban_sdk::{contract, contractimpl, token, Address, Env, Map, Symbol, Vec};

/// Allocation, claims and rewards for underwriter capital.
///
/// Every underwriter pledges its full capital pool principal to each pool it
/// allocates to. Claims debit the pool in O(1) through the loss distributor;
/// each underwriter's share is realized later on its own interactions.
#[contract]
pub struct RiskManager;

#[contractimpl]
impl RiskManager {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the risk manager
    ///
    /// # Errors
    /// - `AlreadyInitialized`: Contract already initialized
    pub fn initialize(
        env: Env,
        admin: Address,
        capital_pool: Address,
        pool_registry: Address,
        loss_distributor: Address,
        policy_book: Address,
        backstop: Address,
        underlying_asset: Address,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Initialized) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Initialized, &true);
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::CapitalPool, &capital_pool);
        env.storage()
            .instance()
            .set(&DataKey::PoolRegistry, &pool_registry);
        env.storage()
            .instance()
            .set(&DataKey::LossDistributor, &loss_distributor);
        env.storage()
            .instance()
            .set(&DataKey::PolicyBook, &policy_book);
        env.storage().instance().set(&DataKey::Backstop, &backstop);
        env.storage()
            .instance()
            .set(&DataKey::UnderlyingAsset, &underlying_asset);

        Ok(())
    }

    /// # Errors
    /// - `InvalidConfig`: zero allocations
    pub fn set_max_allocations(env: Env, max_allocations: u32) -> Result<(), Error> {
        Self::require_admin(&env)?;
        if max_allocations == 0 {
            return Err(Error::InvalidConfig);
        }
        env.storage()
            .instance()
            .set(&DataKey::MaxAllocations, &max_allocations);
        Ok(())
    }

    /// # Errors
    /// - `InvalidConfig`: fee above 50%
    pub fn set_claim_fee_bps(env: Env, fee_bps: i128) -> Result<(), Error> {
        Self::require_admin(&env)?;
        if !(0..=MAX_CLAIM_FEE_BPS).contains(&fee_bps) {
            return Err(Error::InvalidConfig);
        }
        env.storage().instance().set(&DataKey::ClaimFeeBps, &fee_bps);
        Ok(())
    }

    pub fn set_deallocation_notice_period(env: Env, period: u64) -> Result<(), Error> {
        Self::require_admin(&env)?;
        env.storage()
            .instance()
            .set(&DataKey::DeallocationNoticePeriod, &period);
        Ok(())
    }

    pub fn set_policy_book(env: Env, policy_book: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        env.storage()
            .instance()
            .set(&DataKey::PolicyBook, &policy_book);
        Ok(())
    }

    pub fn set_backstop(env: Env, backstop: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        env.storage().instance().set(&DataKey::Backstop, &backstop);
        Ok(())
    }

    // ============================================
    // GOVERNANCE
    // ============================================

    /// Register a pool covering `protocol_token`
    ///
    /// The distressed-asset scale is fixed here from both tokens' decimals.
    ///
    /// # Errors
    /// - `InvalidConfig`: Rate curve out of range
    pub fn add_protocol_risk_pool(
        env: Env,
        protocol_token: Address,
        rate_curve: RateCurve,
        fee_recipient: Address,
    ) -> Result<u32, Error> {
        Self::require_admin(&env)?;
        if !premium::is_valid_curve(&rate_curve) {
            return Err(Error::InvalidConfig);
        }

        let underlying = Storage::address(&env, &DataKey::UnderlyingAsset)?;
        let scale = premium::decimal_scale(
            token::Client::new(&env, &protocol_token).decimals(),
            token::Client::new(&env, &underlying).decimals(),
        )
        .ok_or(Error::Overflow)?;

        let pool_id = positions::registry(&env)?.add_pool(
            &env.current_contract_address(),
            &protocol_token,
            &scale,
            &rate_curve,
            &fee_recipient,
        );

        env.events().publish(
            (Symbol::new(&env, "protocol_pool_added"), pool_id),
            ProtocolPoolAddedEvent {
                pool_id,
                protocol_token,
                scale,
            },
        );

        Ok(pool_id)
    }

    pub fn set_pool_pause_state(env: Env, pool_id: u32, paused: bool) -> Result<(), Error> {
        Self::require_admin(&env)?;
        let registry = positions::registry(&env)?;
        registry.get_pool_data(&pool_id).ok_or(Error::InvalidPoolId)?;
        registry.set_pause_state(&env.current_contract_address(), &pool_id, &paused);
        Ok(())
    }

    pub fn set_pool_fee_recipient(env: Env, pool_id: u32, recipient: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        let registry = positions::registry(&env)?;
        registry.get_pool_data(&pool_id).ok_or(Error::InvalidPoolId)?;
        registry.set_fee_recipient(&env.current_contract_address(), &pool_id, &recipient);
        Ok(())
    }

    // ============================================
    // ALLOCATION
    // ============================================

    /// Pledge the underwriter's full principal to each of `pool_ids`
    ///
    /// Pending losses are realized and charged first, so the pledge is the
    /// post-loss principal.
    ///
    /// # Errors
    /// - `NoCapitalToAllocate`: Nothing deposited in the capital pool
    /// - `ExceedsMaxAllocations`: Empty list or too many pools in total
    /// - `InvalidPoolId`: Pool does not exist
    /// - `PoolPaused`: Pool is paused
    /// - `AlreadyAllocated`: Pool already allocated or listed twice
    pub fn allocate_capital(env: Env, underwriter: Address, pool_ids: Vec<u32>) -> Result<(), Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        positions::realize_and_apply(&env, &underwriter)?;

        let mut info = Storage::get_info(&env, &underwriter).ok_or(Error::NoCapitalToAllocate)?;
        if info.total_pledge <= 0 {
            return Err(Error::NoCapitalToAllocate);
        }
        if pool_ids.is_empty()
            || info.allocations.len() + pool_ids.len() > Self::max_allocations(env.clone())
        {
            return Err(Error::ExceedsMaxAllocations);
        }

        let registry = positions::registry(&env)?;
        let mut seen: Vec<u32> = Vec::new(&env);
        for pool_id in pool_ids.iter() {
            let pool = registry
                .get_pool_data(&pool_id)
                .ok_or(Error::InvalidPoolId)?;
            if pool.is_paused {
                return Err(Error::PoolPaused);
            }
            if info.allocations.contains(pool_id) || seen.contains(pool_id) {
                return Err(Error::AlreadyAllocated);
            }
            seen.push_back(pool_id);
        }

        let adapter = match info.adapter.clone() {
            Some(adapter) => adapter,
            None => {
                let account = positions::capital_pool(&env)?
                    .get_underwriter_account(&underwriter)
                    .ok_or(Error::NoCapitalToAllocate)?;
                info.adapter = Some(account.adapter.clone());
                account.adapter
            }
        };

        let this = env.current_contract_address();
        let amount = info.total_pledge;
        for pool_id in pool_ids.iter() {
            // A closed position may linger with unclaimed rewards
            let mut position = match Storage::get_position(&env, &underwriter, pool_id) {
                Some(mut existing) => {
                    existing.loss_snapshot = positions::loss_distributor(&env)?.accumulator(&pool_id);
                    existing
                }
                None => positions::fresh_position(&env, pool_id)?,
            };
            positions::repledge(&env, pool_id, &mut position, amount)?;
            Storage::set_position(&env, &underwriter, pool_id, &position);
            Storage::add_to_pool(&env, pool_id, &underwriter);
            registry.update_capital_allocation(&this, &pool_id, &adapter, &amount, &true);
            info.allocations.push_back(pool_id);

            env.events().publish(
                (Symbol::new(&env, "capital_allocated"), underwriter.clone(), pool_id),
                CapitalAllocatedEvent {
                    underwriter: underwriter.clone(),
                    pool_id,
                    amount,
                },
            );
        }

        Storage::set_info(&env, &underwriter, &info);
        Ok(())
    }

    /// Start the notice period for releasing `amount` from a pool
    ///
    /// # Errors
    /// - `NotAllocated`: Underwriter not in the pool
    /// - `InvalidAmount`: Not within (0, unreserved pledge]
    /// - `DeallocationRequestPending`: A request is already open
    /// - `InsufficientFreeCapital`: Pool would not cover its sold coverage
    pub fn request_deallocate_from_pool(
        env: Env,
        underwriter: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<(), Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let info = Storage::get_info(&env, &underwriter).ok_or(Error::NotAllocated)?;
        if !info.allocations.contains(pool_id) {
            return Err(Error::NotAllocated);
        }
        let position =
            Storage::get_position(&env, &underwriter, pool_id).ok_or(Error::NotAllocated)?;
        if amount <= 0 || amount > position.pledge - position.reserved {
            return Err(Error::InvalidAmount);
        }
        if Storage::get_deallocation(&env, &underwriter, pool_id).is_some() {
            return Err(Error::DeallocationRequestPending);
        }

        let registry = positions::registry(&env)?;
        let pool = registry
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;
        Self::require_free_capital(&pool, amount)?;

        registry.update_pending_withdrawal(
            &env.current_contract_address(),
            &pool_id,
            &amount,
            &true,
        );

        let requested_at = env.ledger().timestamp();
        Storage::set_deallocation(
            &env,
            &underwriter,
            pool_id,
            &DeallocationRequest {
                amount,
                requested_at,
            },
        );

        env.events().publish(
            (Symbol::new(&env, "deallocation_requested"), underwriter.clone(), pool_id),
            DeallocationRequestedEvent {
                underwriter,
                pool_id,
                amount,
                requested_at,
            },
        );
        Ok(())
    }

    /// # Errors
    /// - `NoDeallocationRequest`: Nothing to cancel
    pub fn cancel_deallocation_request(env: Env, underwriter: Address, pool_id: u32) -> Result<(), Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let request = Storage::get_deallocation(&env, &underwriter, pool_id)
            .ok_or(Error::NoDeallocationRequest)?;
        positions::registry(&env)?.update_pending_withdrawal(
            &env.current_contract_address(),
            &pool_id,
            &request.amount,
            &false,
        );
        Storage::remove_deallocation(&env, &underwriter, pool_id);

        env.events().publish(
            (Symbol::new(&env, "deallocation_cancelled"), underwriter.clone(), pool_id),
            DeallocationCancelledEvent {
                underwriter,
                pool_id,
                amount: request.amount,
            },
        );
        Ok(())
    }

    /// Release a matured deallocation request; returns the amount released
    ///
    /// Losses are realized first and may shrink or close the position, in
    /// which case less (or nothing) is left to release.
    ///
    /// # Errors
    /// - `NoDeallocationRequest`: No open request
    /// - `NoticePeriodActive`: Notice period has not elapsed
    pub fn deallocate_from_pool(env: Env, underwriter: Address, pool_id: u32) -> Result<i128, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let request = Storage::get_deallocation(&env, &underwriter, pool_id)
            .ok_or(Error::NoDeallocationRequest)?;
        let matures_at = request
            .requested_at
            .saturating_add(Self::deallocation_notice_period(env.clone()));
        if env.ledger().timestamp() < matures_at {
            return Err(Error::NoticePeriodActive);
        }

        positions::realize_and_apply(&env, &underwriter)?;

        // Realization may have closed the position or clamped the request
        let Some(mut info) = Storage::get_info(&env, &underwriter) else {
            return Ok(0);
        };
        let Some(request) = Storage::get_deallocation(&env, &underwriter, pool_id) else {
            return Ok(0);
        };
        let mut position =
            Storage::get_position(&env, &underwriter, pool_id).ok_or(Error::NotAllocated)?;
        let adapter = info.adapter.clone().ok_or(Error::NotAllocated)?;

        let registry = positions::registry(&env)?;
        let this = env.current_contract_address();
        let released = request.amount.min(position.pledge);

        registry.update_pending_withdrawal(&this, &pool_id, &request.amount, &false);
        Storage::remove_deallocation(&env, &underwriter, pool_id);
        if released > 0 {
            registry.update_capital_allocation(&this, &pool_id, &adapter, &released, &false);
        }
        let remaining = position.pledge - released;
        positions::repledge(&env, pool_id, &mut position, remaining)?;

        if position.pledge == 0 {
            positions::close_position(&env, &underwriter, pool_id, position, &adapter)?;
            if let Some(index) = info.allocations.first_index_of(pool_id) {
                info.allocations.remove(index);
            }
            Storage::set_info(&env, &underwriter, &info);
        } else {
            positions::clamp_reservations(&env, &underwriter, pool_id, &mut position)?;
            Storage::set_position(&env, &underwriter, pool_id, &position);
        }

        env.events().publish(
            (Symbol::new(&env, "capital_deallocated"), underwriter.clone(), pool_id),
            CapitalDeallocatedEvent {
                underwriter,
                pool_id,
                amount: released,
            },
        );
        Ok(released)
    }

    // ============================================
    // CAPITAL POOL HOOKS
    // ============================================

    /// Returns losses realized on the capital pool's behalf
    ///
    /// # Errors
    /// - `NotCapitalLedger`: Caller is not the capital pool
    pub fn on_capital_deposited(
        env: Env,
        caller: Address,
        underwriter: Address,
        amount: i128,
    ) -> Result<RealizedLoss, Error> {
        Self::require_capital_pool(&env, &caller)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let realized = positions::realize(&env, &underwriter)?;

        let mut info = Storage::get_info(&env, &underwriter).unwrap_or(UnderwriterInfo {
            total_pledge: 0,
            adapter: None,
            allocations: Vec::new(&env),
        });
        info.total_pledge = info
            .total_pledge
            .checked_add(amount)
            .ok_or(Error::Overflow)?;

        if !info.allocations.is_empty() {
            let adapter = info.adapter.clone().ok_or(Error::NotAllocated)?;
            let registry = positions::registry(&env)?;
            let this = env.current_contract_address();
            for pool_id in info.allocations.iter() {
                let Some(mut position) = Storage::get_position(&env, &underwriter, pool_id) else {
                    continue;
                };
                let pledge = position.pledge.checked_add(amount).ok_or(Error::Overflow)?;
                positions::repledge(&env, pool_id, &mut position, pledge)?;
                Storage::set_position(&env, &underwriter, pool_id, &position);
                registry.update_capital_allocation(&this, &pool_id, &adapter, &amount, &true);
            }
        }

        Storage::set_info(&env, &underwriter, &info);
        Ok(realized)
    }

    /// Reserve pledged capital for a queued withdrawal; returns the amount
    /// reserved in each pool
    ///
    /// # Errors
    /// - `NotCapitalLedger`: Caller is not the capital pool
    /// - `InsufficientFreeCapital`: A pool would be left under-collateralized
    pub fn on_withdrawal_requested(
        env: Env,
        caller: Address,
        underwriter: Address,
        principal_component: i128,
    ) -> Result<Map<u32, i128>, Error> {
        Self::require_capital_pool(&env, &caller)?;
        let mut reservations = Map::new(&env);
        let Some(info) = Storage::get_info(&env, &underwriter) else {
            return Ok(reservations);
        };
        if principal_component <= 0 {
            return Ok(reservations);
        }

        let registry = positions::registry(&env)?;
        let this = env.current_contract_address();
        for pool_id in info.allocations.iter() {
            let Some(mut position) = Storage::get_position(&env, &underwriter, pool_id) else {
                continue;
            };
            let requested = Storage::get_deallocation(&env, &underwriter, pool_id)
                .map(|r| r.amount)
                .unwrap_or(0);
            let free = (position.pledge - position.reserved - requested).max(0);
            let reserve = principal_component.min(free);
            if reserve == 0 {
                continue;
            }

            let pool = registry
                .get_pool_data(&pool_id)
                .ok_or(Error::InvalidPoolId)?;
            Self::require_free_capital(&pool, reserve)?;

            registry.update_pending_withdrawal(&this, &pool_id, &reserve, &true);
            position.reserved += reserve;
            Storage::set_position(&env, &underwriter, pool_id, &position);
            reservations.set(pool_id, reserve);
        }
        Ok(reservations)
    }

    /// Release what a cancelled request reserved
    ///
    /// # Errors
    /// - `NotCapitalLedger`: Caller is not the capital pool
    pub fn on_withdrawal_cancelled(
        env: Env,
        caller: Address,
        underwriter: Address,
        reservations: Map<u32, i128>,
    ) -> Result<(), Error> {
        Self::require_capital_pool(&env, &caller)?;
        let Some(info) = Storage::get_info(&env, &underwriter) else {
            return Ok(());
        };

        let registry = positions::registry(&env)?;
        let this = env.current_contract_address();
        for pool_id in info.allocations.iter() {
            let Some(mut position) = Storage::get_position(&env, &underwriter, pool_id) else {
                continue;
            };
            let reserved = reservations.get(pool_id).unwrap_or(0);
            let released = position.reserved.min(reserved.max(0));
            if released > 0 {
                registry.update_pending_withdrawal(&this, &pool_id, &released, &false);
                position.reserved -= released;
                Storage::set_position(&env, &underwriter, pool_id, &position);
            }
        }
        Ok(())
    }

    /// Realize pending losses before a withdrawal is priced
    ///
    /// # Errors
    /// - `NotCapitalLedger`: Caller is not the capital pool
    pub fn on_withdrawal_executing(
        env: Env,
        caller: Address,
        underwriter: Address,
    ) -> Result<RealizedLoss, Error> {
        Self::require_capital_pool(&env, &caller)?;
        positions::realize(&env, &underwriter)
    }

    /// Shrink pledges after principal left the capital pool
    ///
    /// # Errors
    /// - `NotCapitalLedger`: Caller is not the capital pool
    pub fn on_capital_withdrawn(
        env: Env,
        caller: Address,
        underwriter: Address,
        principal_removed: i128,
        reservations: Map<u32, i128>,
        is_full_withdrawal: bool,
    ) -> Result<(), Error> {
        Self::require_capital_pool(&env, &caller)?;
        let Some(mut info) = Storage::get_info(&env, &underwriter) else {
            return Ok(());
        };

        if is_full_withdrawal {
            positions::close_all(&env, &underwriter, &mut info)?;
            info.total_pledge = 0;
            info.adapter = None;
            Storage::set_info(&env, &underwriter, &info);
            return Ok(());
        }

        let remaining = (info.total_pledge - principal_removed.max(0)).max(0);
        if !info.allocations.is_empty() {
            let adapter = info.adapter.clone().ok_or(Error::NotAllocated)?;
            let registry = positions::registry(&env)?;
            let this = env.current_contract_address();

            let mut kept: Vec<u32> = Vec::new(&env);
            for pool_id in info.allocations.iter() {
                let Some(mut position) = Storage::get_position(&env, &underwriter, pool_id) else {
                    continue;
                };

                let reserved = reservations.get(pool_id).unwrap_or(0);
                let released = position.reserved.min(reserved.max(0));
                if released > 0 {
                    registry.update_pending_withdrawal(&this, &pool_id, &released, &false);
                    position.reserved -= released;
                }

                let after = position.pledge.min(remaining);
                if after < position.pledge {
                    let removed = position.pledge - after;
                    registry.update_capital_allocation(&this, &pool_id, &adapter, &removed, &false);
                }
                positions::repledge(&env, pool_id, &mut position, after)?;

                if after == 0 {
                    positions::close_position(&env, &underwriter, pool_id, position, &adapter)?;
                } else {
                    positions::clamp_reservations(&env, &underwriter, pool_id, &mut position)?;
                    Storage::set_position(&env, &underwriter, pool_id, &position);
                    kept.push_back(pool_id);
                }
            }
            info.allocations = kept;
        }

        info.total_pledge = remaining;
        Storage::set_info(&env, &underwriter, &info);
        Ok(())
    }

    // ============================================
    // LOSSES & LIQUIDATION
    // ============================================

    /// Realize and charge an underwriter's pending losses. Callable by anyone.
    pub fn realize_losses(env: Env, underwriter: Address) -> Result<i128, Error> {
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;
        positions::realize_and_apply(&env, &underwriter)
    }

    /// Remove an underwriter whose pending losses exceed its share value
    ///
    /// Returns the losses charged. No bounty is paid.
    ///
    /// # Errors
    /// - `NotInsolvent`: Pending losses within share value
    pub fn liquidate_insolvent_underwriter(
        env: Env,
        liquidator: Address,
        target: Address,
    ) -> Result<i128, Error> {
        liquidator.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let pending = positions::pending_losses(&env, &target)?;
        let capital_pool = positions::capital_pool(&env)?;
        let share_value = match capital_pool.get_underwriter_account(&target) {
            Some(account) => capital_pool.shares_to_value(&account.shares),
            None => 0,
        };
        if pending <= share_value {
            return Err(Error::NotInsolvent);
        }

        let losses = positions::realize_and_apply(&env, &target)?;
        if let Some(mut info) = Storage::get_info(&env, &target) {
            positions::close_all(&env, &target, &mut info)?;
            Storage::set_info(&env, &target, &info);
        }

        env.events().publish(
            (Symbol::new(&env, "underwriter_liquidated"), target.clone()),
            UnderwriterLiquidatedEvent {
                underwriter: target,
                liquidator,
                losses,
            },
        );
        Ok(losses)
    }

    // ============================================
    // CLAIMS
    // ============================================

    /// Pay out a policy; returns the net amount sent to the claimant
    ///
    /// Pool capital funds up to `capital_pledged` (fee first), the backstop
    /// covers the rest. Underwriters owe only what the adapters paid. The
    /// claimant hands over `coverage × scale` protocol tokens, which accrue
    /// to the pool's underwriters.
    ///
    /// # Errors
    /// - `PolicyNotFound`: Unknown policy
    /// - `NotPolicyOwner`: Claimant does not own the policy
    /// - `PolicyNotActive`: No coverage or activation in the future
    /// - `InvalidPoolId`: Policy points at an unknown pool
    /// - `PremiumsOutstanding`: Premium owed is not settled
    /// - `PoolPaused`: Pool is paused
    /// - `BackstopShortfall`: Backstop could not cover the excess
    pub fn process_claim(env: Env, claimant: Address, policy_id: u64) -> Result<i128, Error> {
        claimant.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let book = PolicyBookClient::new(&env, &Storage::address(&env, &DataKey::PolicyBook)?);
        let policy = book.get_policy(&policy_id).ok_or(Error::PolicyNotFound)?;
        if policy.owner != claimant {
            return Err(Error::NotPolicyOwner);
        }
        if policy.coverage <= 0 || env.ledger().timestamp() < policy.activation {
            return Err(Error::PolicyNotActive);
        }

        let pool_id = policy.pool_id;
        let registry = positions::registry(&env)?;
        let pool = registry
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;
        if Self::owed(&env, &policy, &pool)? > 0 {
            return Err(Error::PremiumsOutstanding);
        }
        if pool.is_paused {
            return Err(Error::PoolPaused);
        }

        let coverage = policy.coverage;
        let (net, fee) = premium::claim_split(coverage, Self::claim_fee_bps(env.clone()))
            .ok_or(Error::Overflow)?;
        let mut accrual = Storage::get_accrual(&env, pool_id);
        let lp_funded = if accrual.total_pledge > 0 {
            coverage.min(pool.capital_pledged).max(0)
        } else {
            0
        };
        let fee_from_lps = fee.min(lp_funded);
        let net_from_lps = lp_funded - fee_from_lps;

        let this = env.current_contract_address();
        if lp_funded > 0 {
            let mut adapters = Vec::new(&env);
            let mut capital_per_adapter = Vec::new(&env);
            for (adapter, capital) in registry.get_pool_adapters(&pool_id).iter() {
                adapters.push_back(adapter);
                capital_per_adapter.push_back(capital);
            }

            let collected = positions::capital_pool(&env)?.execute_payout(
                &this,
                &PayoutData {
                    claimant: claimant.clone(),
                    claimant_amount: net_from_lps,
                    fee_recipient: pool.fee_recipient.clone(),
                    fee_amount: fee_from_lps,
                    adapters,
                    capital_per_adapter,
                    total_capital_from_pool_lps: pool.capital_pledged,
                },
            );
            // Backstop money inside the payout is not owed by underwriters
            if collected > 0 {
                positions::loss_distributor(&env)?.record_loss(
                    &this,
                    &pool_id,
                    &collected,
                    &accrual.total_pledge,
                );
                registry.record_claim_loss(&this, &pool_id, &collected);
            }
        }

        let backstop = Storage::address(&env, &DataKey::Backstop)?;
        let from_backstop = coverage - lp_funded;
        if from_backstop > 0 {
            match BackstopClient::new(&env, &backstop).try_draw_fund(&from_backstop, &this) {
                Ok(Ok(drawn)) if drawn >= from_backstop => {}
                _ => return Err(Error::BackstopShortfall),
            }

            let underlying =
                token::Client::new(&env, &Storage::address(&env, &DataKey::UnderlyingAsset)?);
            let net_rest = net - net_from_lps;
            let fee_rest = fee - fee_from_lps;
            if net_rest > 0 {
                underlying.transfer(&this, &claimant, &net_rest);
            }
            if fee_rest > 0 {
                underlying.transfer(&this, &pool.fee_recipient, &fee_rest);
            }
        }

        registry.update_coverage_sold(&this, &pool_id, &coverage, &false);

        // Distressed protocol tokens go to the pool's underwriters
        let distressed = coverage.checked_mul(pool.scale).ok_or(Error::Overflow)?;
        let protocol_token = token::Client::new(&env, &pool.protocol_token);
        if accrual.total_pledge > 0 {
            protocol_token.transfer(&claimant, &this, &distressed);
            let increment = per_pledge(distressed, accrual.total_pledge).ok_or(Error::Overflow)?;
            accrual.distressed_per_pledge = accrual
                .distressed_per_pledge
                .checked_add(increment)
                .ok_or(Error::Overflow)?;
            Storage::set_accrual(&env, pool_id, &accrual);
        } else {
            protocol_token.transfer(&claimant, &backstop, &distressed);
        }

        book.close_policy(&this, &policy_id);

        env.events().publish(
            (Symbol::new(&env, "claim_processed"), pool_id, policy_id),
            ClaimProcessedEvent {
                policy_id,
                pool_id,
                claimant,
                net_payout: net,
                fee,
                from_backstop,
            },
        );

        Ok(net)
    }

    /// Premium accrued and unpaid on a policy
    ///
    /// # Errors
    /// - `PolicyNotFound`: Unknown policy
    /// - `InvalidPoolId`: Policy points at an unknown pool
    pub fn premium_owed(env: Env, policy_id: u64) -> Result<i128, Error> {
        let book = PolicyBookClient::new(&env, &Storage::address(&env, &DataKey::PolicyBook)?);
        let policy = book.get_policy(&policy_id).ok_or(Error::PolicyNotFound)?;
        let pool = positions::registry(&env)?
            .get_pool_data(&policy.pool_id)
            .ok_or(Error::InvalidPoolId)?;
        Self::owed(&env, &policy, &pool)
    }

    // ============================================
    // POLICY BOOK HOOKS
    // ============================================

    /// # Errors
    /// - `NotPolicyBook`: Caller is not the policy book
    /// - `InvalidAmount`: Negative amount
    /// - `InvalidPoolId`: Pool does not exist
    /// - `InsufficientCapacity`: Sale beyond unreserved pool capital
    pub fn update_coverage_sold(
        env: Env,
        caller: Address,
        pool_id: u32,
        amount: i128,
        is_sale: bool,
    ) -> Result<(), Error> {
        Self::require_policy_book(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let registry = positions::registry(&env)?;
        let pool = registry
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;

        if is_sale {
            let sold = pool
                .coverage_sold
                .checked_add(amount)
                .ok_or(Error::Overflow)?;
            if sold > pool.capital_pledged - pool.pending_withdrawal {
                return Err(Error::InsufficientCapacity);
            }
        }

        registry.update_coverage_sold(&env.current_contract_address(), &pool_id, &amount, &is_sale);
        Ok(())
    }

    /// Accrue premium the policy book has already transferred here
    ///
    /// # Errors
    /// - `NotPolicyBook`: Caller is not the policy book
    /// - `InvalidAmount`: amount must be positive
    /// - `InvalidPoolId`: Pool does not exist
    /// - `NoCapitalInPool`: Nobody to accrue to
    pub fn distribute_premium(env: Env, caller: Address, pool_id: u32, amount: i128) -> Result<(), Error> {
        Self::require_policy_book(&env, &caller)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        positions::registry(&env)?
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;

        let mut accrual = Storage::get_accrual(&env, pool_id);
        if accrual.total_pledge <= 0 {
            return Err(Error::NoCapitalInPool);
        }
        let increment = per_pledge(amount, accrual.total_pledge).ok_or(Error::Overflow)?;
        accrual.premium_per_pledge = accrual
            .premium_per_pledge
            .checked_add(increment)
            .ok_or(Error::Overflow)?;
        Storage::set_accrual(&env, pool_id, &accrual);

        env.events().publish(
            (Symbol::new(&env, "premium_distributed"), pool_id),
            PremiumDistributedEvent { pool_id, amount },
        );
        Ok(())
    }

    // ============================================
    // REWARDS
    // ============================================

    /// Transfer settled premium in the underlying asset
    ///
    /// # Errors
    /// - `InvalidPoolId`: Pool does not exist
    /// - `NoRewardsToClaim`: Nothing accrued
    pub fn claim_premium_rewards(env: Env, underwriter: Address, pool_id: u32) -> Result<i128, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        positions::registry(&env)?
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;
        let mut position =
            Storage::get_position(&env, &underwriter, pool_id).ok_or(Error::NoRewardsToClaim)?;
        positions::settle_rewards(&env, pool_id, &mut position)?;

        let amount = position.pending_premium;
        if amount <= 0 {
            return Err(Error::NoRewardsToClaim);
        }
        position.pending_premium = 0;
        Self::store_settled(&env, &underwriter, pool_id, &position);

        let underlying = Storage::address(&env, &DataKey::UnderlyingAsset)?;
        token::Client::new(&env, &underlying).transfer(
            &env.current_contract_address(),
            &underwriter,
            &amount,
        );

        env.events().publish(
            (Symbol::new(&env, "premium_rewards_claimed"), underwriter.clone(), pool_id),
            RewardsClaimedEvent {
                underwriter,
                pool_id,
                amount,
            },
        );
        Ok(amount)
    }

    /// Transfer settled distressed assets in the pool's protocol token
    ///
    /// # Errors
    /// - `InvalidPoolId`: Pool does not exist
    /// - `NoRewardsToClaim`: Nothing accrued
    pub fn claim_distressed_assets(env: Env, underwriter: Address, pool_id: u32) -> Result<i128, Error> {
        underwriter.require_auth();
        let _guard = ReentrancyGuard::acquire(&env).ok_or(Error::Reentrant)?;

        let pool = positions::registry(&env)?
            .get_pool_data(&pool_id)
            .ok_or(Error::InvalidPoolId)?;
        let mut position =
            Storage::get_position(&env, &underwriter, pool_id).ok_or(Error::NoRewardsToClaim)?;
        positions::settle_rewards(&env, pool_id, &mut position)?;

        let amount = position.pending_distressed;
        if amount <= 0 {
            return Err(Error::NoRewardsToClaim);
        }
        position.pending_distressed = 0;
        Self::store_settled(&env, &underwriter, pool_id, &position);

        token::Client::new(&env, &pool.protocol_token).transfer(
            &env.current_contract_address(),
            &underwriter,
            &amount,
        );

        env.events().publish(
            (Symbol::new(&env, "distressed_assets_claimed"), underwriter.clone(), pool_id),
            RewardsClaimedEvent {
                underwriter,
                pool_id,
                amount,
            },
        );
        Ok(amount)
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    pub fn get_underwriter_info(env: Env, underwriter: Address) -> Option<UnderwriterInfo> {
        Storage::get_info(&env, &underwriter)
    }

    pub fn get_pool_position(env: Env, underwriter: Address, pool_id: u32) -> Option<PoolPosition> {
        Storage::get_position(&env, &underwriter, pool_id)
    }

    /// Underwriters currently pledged to a pool
    pub fn get_pool_underwriters(env: Env, pool_id: u32) -> Vec<Address> {
        Storage::pool_underwriters(&env, pool_id)
    }

    pub fn get_underwriter_pool_index(env: Env, pool_id: u32, underwriter: Address) -> Option<u32> {
        Storage::pool_index(&env, pool_id, &underwriter)
    }

    pub fn get_deallocation_request(
        env: Env,
        underwriter: Address,
        pool_id: u32,
    ) -> Option<DeallocationRequest> {
        Storage::get_deallocation(&env, &underwriter, pool_id)
    }

    /// Unrealized losses across every allocated pool
    pub fn pending_losses(env: Env, underwriter: Address) -> Result<i128, Error> {
        positions::pending_losses(&env, &underwriter)
    }

    /// Claimable rewards in a pool, including accruals not yet settled
    pub fn pending_rewards(env: Env, underwriter: Address, pool_id: u32) -> Result<PendingRewards, Error> {
        let Some(mut position) = Storage::get_position(&env, &underwriter, pool_id) else {
            return Ok(PendingRewards {
                premium: 0,
                distressed: 0,
            });
        };
        positions::settle_rewards(&env, pool_id, &mut position)?;
        Ok(PendingRewards {
            premium: position.pending_premium,
            distressed: position.pending_distressed,
        })
    }

    pub fn get_pool_accrual(env: Env, pool_id: u32) -> PoolAccrual {
        Storage::get_accrual(&env, pool_id)
    }

    pub fn admin(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Admin)
    }

    pub fn capital_pool(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::CapitalPool)
    }

    pub fn pool_registry(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::PoolRegistry)
    }

    pub fn loss_distributor(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::LossDistributor)
    }

    pub fn policy_book(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::PolicyBook)
    }

    pub fn backstop(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Backstop)
    }

    pub fn underlying_asset(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::UnderlyingAsset)
    }

    pub fn max_allocations(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::MaxAllocations)
            .unwrap_or(DEFAULT_MAX_ALLOCATIONS)
    }

    pub fn claim_fee_bps(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::ClaimFeeBps)
            .unwrap_or(DEFAULT_CLAIM_FEE_BPS)
    }

    pub fn deallocation_notice_period(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::DeallocationNoticePeriod)
            .unwrap_or(0)
    }

    // ============================================
    // INTERNAL HELPERS
    // ============================================

    fn owed(env: &Env, policy: &PolicyRecord, pool: &PoolData) -> Result<i128, Error> {
        if policy.coverage <= 0 {
            return Ok(0);
        }
        let now = env.ledger().timestamp();
        let start = policy.activation.max(policy.last_paid_until);
        if now <= start {
            return Ok(0);
        }

        let utilization = premium::utilization_bps(pool.coverage_sold, pool.capital_pledged)
            .ok_or(Error::Overflow)?;
        let rate = premium::annual_rate_bps(&pool.rate_curve, utilization).ok_or(Error::Overflow)?;
        premium::premium_for(policy.coverage, rate, now - start).ok_or(Error::Overflow)
    }

    /// Capital left after the release must still cover sold coverage
    fn require_free_capital(pool: &PoolData, amount: i128) -> Result<(), Error> {
        let free = pool.capital_pledged - pool.pending_withdrawal - amount;
        if free < pool.coverage_sold {
            return Err(Error::InsufficientFreeCapital);
        }
        Ok(())
    }

    /// Positions no longer pledged are dropped once their rewards are paid
    fn store_settled(env: &Env, underwriter: &Address, pool_id: u32, position: &PoolPosition) {
        if position.pledge == 0 && position.pending_premium == 0 && position.pending_distressed == 0 {
            Storage::remove_position(env, underwriter, pool_id);
        } else {
            Storage::set_position(env, underwriter, pool_id, position);
        }
    }

    fn require_admin(env: &Env) -> Result<(), Error> {
        let admin = Storage::address(env, &DataKey::Admin)?;
        admin.require_auth();
        Ok(())
    }

    fn require_capital_pool(env: &Env, caller: &Address) -> Result<(), Error> {
        if *caller != Storage::address(env, &DataKey::CapitalPool)? {
            return Err(Error::NotCapitalLedger);
        }
        caller.require_auth();
        Ok(())
    }

    fn require_policy_book(env: &Env, caller: &Address) -> Result<(), Error> {
        if *caller != Storage::address(env, &DataKey::PolicyBook)? {
            return Err(Error::NotPolicyBook);
        }
        caller.require_auth();
        Ok(())
    }
}

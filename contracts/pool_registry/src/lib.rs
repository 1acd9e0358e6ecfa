#![no_std]

mod error;
mod events;
mod storage;


pub use error::Error;
use events::*;
use storage::DataKey;

use capital_interfaces::{PoolData, RateCurve};
use soroban_sdk::{contract, contractimpl, Address, Env, Map, Symbol};

#[contract]
pub struct PoolRegistry;

#[contractimpl]
impl PoolRegistry {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the registry
    ///
    /// # Errors
    /// - `AlreadyInitialized`: Contract already initialized
    pub fn initialize(env: Env, admin: Address, risk_manager: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Initialized) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Initialized, &true);
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::RiskManager, &risk_manager);
        env.storage().instance().set(&DataKey::PoolCount, &0u32);

        Ok(())
    }

    /// Replace the risk manager allowed to mutate pools
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    pub fn set_risk_manager(env: Env, risk_manager: Address) -> Result<(), Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)?;
        admin.require_auth();

        env.storage()
            .instance()
            .set(&DataKey::RiskManager, &risk_manager);
        Ok(())
    }

    // ============================================
    // POOL LIFECYCLE (RISK MANAGER ONLY)
    // ============================================

    /// Register a new risk pool and return its id
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidScale`: scale must be positive
    pub fn add_pool(
        env: Env,
        caller: Address,
        protocol_token: Address,
        scale: i128,
        rate_curve: RateCurve,
        fee_recipient: Address,
    ) -> Result<u32, Error> {
        Self::require_risk_manager(&env, &caller)?;

        if scale <= 0 {
            return Err(Error::InvalidScale);
        }

        let pool_id = Self::get_pool_count(env.clone());
        let pool = PoolData {
            protocol_token: protocol_token.clone(),
            scale,
            capital_pledged: 0,
            coverage_sold: 0,
            pending_withdrawal: 0,
            is_paused: false,
            paused_at: 0,
            fee_recipient,
            rate_curve,
        };

        env.storage()
            .persistent()
            .set(&DataKey::Pool(pool_id), &pool);
        env.storage()
            .instance()
            .set(&DataKey::PoolCount, &(pool_id + 1));

        env.events().publish(
            (Symbol::new(&env, "pool_added"), pool_id),
            PoolAddedEvent {
                pool_id,
                protocol_token,
                scale,
            },
        );

        Ok(pool_id)
    }

    /// Pause or unpause claims and allocations on a pool
    pub fn set_pause_state(env: Env, caller: Address, pool_id: u32, paused: bool) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        let mut pool = Self::load_pool(&env, pool_id)?;

        let now = env.ledger().timestamp();
        pool.is_paused = paused;
        if paused {
            pool.paused_at = now;
        }
        Self::save_pool(&env, pool_id, &pool);

        env.events().publish(
            (Symbol::new(&env, "pool_paused"), pool_id),
            PoolPausedEvent {
                pool_id,
                paused,
                timestamp: now,
            },
        );
        Ok(())
    }

    pub fn set_fee_recipient(
        env: Env,
        caller: Address,
        pool_id: u32,
        recipient: Address,
    ) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        let mut pool = Self::load_pool(&env, pool_id)?;
        pool.fee_recipient = recipient;
        Self::save_pool(&env, pool_id, &pool);
        Ok(())
    }

    // ============================================
    // CAPITAL BOOKKEEPING (RISK MANAGER ONLY)
    // ============================================

    /// Add or remove capital pledged to a pool through `adapter`
    ///
    /// Removals saturate at zero per adapter and for the pool total.
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidPoolId`: Pool does not exist
    /// - `InvalidAmount`: amount must be non-negative
    pub fn update_capital_allocation(
        env: Env,
        caller: Address,
        pool_id: u32,
        adapter: Address,
        amount: i128,
        is_allocation: bool,
    ) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let mut pool = Self::load_pool(&env, pool_id)?;
        let mut adapters = Self::get_pool_adapters(env.clone(), pool_id);
        let current = adapters.get(adapter.clone()).unwrap_or(0);

        if is_allocation {
            pool.capital_pledged = pool
                .capital_pledged
                .checked_add(amount)
                .ok_or(Error::Overflow)?;
            adapters.set(adapter, current.checked_add(amount).ok_or(Error::Overflow)?);
        } else {
            pool.capital_pledged = (pool.capital_pledged - amount).max(0);
            let remaining = (current - amount).max(0);
            if remaining == 0 {
                adapters.remove(adapter);
            } else {
                adapters.set(adapter, remaining);
            }
        }

        Self::save_pool(&env, pool_id, &pool);
        env.storage()
            .persistent()
            .set(&DataKey::PoolAdapters(pool_id), &adapters);
        Ok(())
    }

    /// Reserve or release capital for pending withdrawals
    pub fn update_pending_withdrawal(
        env: Env,
        caller: Address,
        pool_id: u32,
        amount: i128,
        is_request: bool,
    ) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let mut pool = Self::load_pool(&env, pool_id)?;

        pool.pending_withdrawal = if is_request {
            pool.pending_withdrawal
                .checked_add(amount)
                .ok_or(Error::Overflow)?
        } else {
            (pool.pending_withdrawal - amount).max(0)
        };

        Self::save_pool(&env, pool_id, &pool);
        Ok(())
    }

    pub fn update_coverage_sold(
        env: Env,
        caller: Address,
        pool_id: u32,
        amount: i128,
        is_sale: bool,
    ) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let mut pool = Self::load_pool(&env, pool_id)?;

        pool.coverage_sold = if is_sale {
            pool.coverage_sold
                .checked_add(amount)
                .ok_or(Error::Overflow)?
        } else {
            (pool.coverage_sold - amount).max(0)
        };

        Self::save_pool(&env, pool_id, &pool);
        Ok(())
    }

    /// Remove claim money from the pool and its adapters
    ///
    /// Each adapter gives up its pro-rata share. Shares are taken on the
    /// cumulative total so the per-adapter reductions sum to `amount`.
    ///
    /// # Errors
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidPoolId`: Pool does not exist
    /// - `InvalidAmount`: amount must be non-negative
    pub fn record_claim_loss(env: Env, caller: Address, pool_id: u32, amount: i128) -> Result<(), Error> {
        Self::require_risk_manager(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }
        let mut pool = Self::load_pool(&env, pool_id)?;
        let adapters = Self::get_pool_adapters(env.clone(), pool_id);

        let mut adapter_total: i128 = 0;
        for (_, capital) in adapters.iter() {
            adapter_total = adapter_total.checked_add(capital).ok_or(Error::Overflow)?;
        }
        let loss = amount.min(adapter_total);

        let mut updated = Map::new(&env);
        if adapter_total > 0 {
            let mut cumulative: i128 = 0;
            let mut taken: i128 = 0;
            for (adapter, capital) in adapters.iter() {
                cumulative += capital;
                let due = loss
                    .checked_mul(cumulative)
                    .ok_or(Error::Overflow)?
                    / adapter_total;
                let share = due - taken;
                taken = due;

                let remaining = capital - share;
                if remaining > 0 {
                    updated.set(adapter, remaining);
                }
            }
        }

        pool.capital_pledged = (pool.capital_pledged - amount).max(0);
        Self::save_pool(&env, pool_id, &pool);
        env.storage()
            .persistent()
            .set(&DataKey::PoolAdapters(pool_id), &updated);

        env.events().publish(
            (Symbol::new(&env, "claim_loss_recorded"), pool_id),
            ClaimLossRecordedEvent {
                pool_id,
                amount,
                capital_pledged: pool.capital_pledged,
            },
        );
        Ok(())
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    pub fn get_pool_data(env: Env, pool_id: u32) -> Option<PoolData> {
        env.storage().persistent().get(&DataKey::Pool(pool_id))
    }

    pub fn get_pool_count(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::PoolCount)
            .unwrap_or(0)
    }

    /// Capital backing the pool, keyed by adapter
    pub fn get_pool_adapters(env: Env, pool_id: u32) -> Map<Address, i128> {
        env.storage()
            .persistent()
            .get(&DataKey::PoolAdapters(pool_id))
            .unwrap_or(Map::new(&env))
    }

    pub fn get_capital_per_adapter(env: Env, pool_id: u32, adapter: Address) -> i128 {
        Self::get_pool_adapters(env, pool_id)
            .get(adapter)
            .unwrap_or(0)
    }

    // ============================================
    // INTERNAL HELPERS
    // ============================================

    fn require_risk_manager(env: &Env, caller: &Address) -> Result<(), Error> {
        let risk_manager: Address = env
            .storage()
            .instance()
            .get(&DataKey::RiskManager)
            .ok_or(Error::NotInitialized)?;
        if *caller != risk_manager {
            return Err(Error::NotRiskManager);
        }
        caller.require_auth();
        Ok(())
    }

    fn load_pool(env: &Env, pool_id: u32) -> Result<PoolData, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Pool(pool_id))
            .ok_or(Error::InvalidPoolId)
    }

    fn save_pool(env: &Env, pool_id: u32, pool: &PoolData) {
        env.storage().persistent().set(&DataKey::Pool(pool_id), pool);
    }
}

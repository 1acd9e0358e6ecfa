#![no_std]

mod error;
mod events;
mod storage;


pub use error::Error;
use events::*;
use storage::DataKey;

use capital_interfaces::math::{accrued, per_pledge};
use soroban_sdk::{contract, contractimpl, Address, Env, Symbol};

/// Per-pool loss accumulator.
///
/// A claim against a pool raises the pool's loss-per-pledge accumulator once;
/// each underwriter's share is derived later from its pledge and snapshot, so
/// recording a loss never touches individual positions.
#[contract]
pub struct LossDistributor;

#[contractimpl]
impl LossDistributor {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the distributor
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

        Ok(())
    }

    /// Point the distributor at a new risk manager
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

        env.events().publish(
            (Symbol::new(&env, "risk_manager_set"),),
            RiskManagerSetEvent { risk_manager },
        );

        Ok(())
    }

    // ============================================
    // LOSS RECORDING
    // ============================================

    /// Spread `amount` of loss over everyone pledged to `pool_id`
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NotRiskManager`: Caller is not the risk manager
    /// - `InvalidAmount`: amount must be positive
    /// - `ZeroPledge`: Nothing pledged to the pool
    /// - `Overflow`: Accumulator overflow
    pub fn record_loss(
        env: Env,
        caller: Address,
        pool_id: u32,
        amount: i128,
        total_pledge: i128,
    ) -> Result<(), Error> {
        let risk_manager: Address = env
            .storage()
            .instance()
            .get(&DataKey::RiskManager)
            .ok_or(Error::NotInitialized)?;
        if caller != risk_manager {
            return Err(Error::NotRiskManager);
        }
        caller.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        if total_pledge <= 0 {
            return Err(Error::ZeroPledge);
        }

        let increment = per_pledge(amount, total_pledge).ok_or(Error::Overflow)?;
        let updated = Self::accumulator(env.clone(), pool_id)
            .checked_add(increment)
            .ok_or(Error::Overflow)?;

        env.storage()
            .persistent()
            .set(&DataKey::LossPerPledge(pool_id), &updated);

        env.events().publish(
            (Symbol::new(&env, "loss_recorded"), pool_id),
            LossRecordedEvent {
                pool_id,
                amount,
                total_pledge,
                cumulative_loss_per_pledge: updated,
            },
        );

        Ok(())
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    /// Loss accrued by `pledge` in `pool_id` since `snapshot`
    ///
    /// # Errors
    /// - `InvalidInput`: Negative pledge or snapshot
    /// - `Overflow`: Pledge too large for the accumulator delta
    pub fn pending_loss(env: Env, pool_id: u32, pledge: i128, snapshot: i128) -> Result<i128, Error> {
        if pledge < 0 || snapshot < 0 {
            return Err(Error::InvalidInput);
        }
        let acc = Self::accumulator(env, pool_id);
        accrued(acc, snapshot, pledge).ok_or(Error::Overflow)
    }

    /// Current loss-per-pledge accumulator of a pool
    pub fn accumulator(env: Env, pool_id: u32) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::LossPerPledge(pool_id))
            .unwrap_or(0)
    }

    pub fn risk_manager(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::RiskManager)
    }
}

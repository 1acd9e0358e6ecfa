use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::error::Error;

// Constants
pub const DEFAULT_MAX_ALLOCATIONS: u32 = 5;
pub const DEFAULT_CLAIM_FEE_BPS: i128 = 500; // 5%
pub const MAX_CLAIM_FEE_BPS: i128 = 5_000; // 50%

/// Risk-side view of an underwriter
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnderwriterInfo {
    /// Mirror of the capital pool principal, kept current by hooks
    pub total_pledge: i128,
    /// Adapter holding the underwriter's capital, resolved on first allocation
    pub adapter: Option<Address>,
    /// Pools the pledge backs
    pub allocations: Vec<u32>,
}

/// One underwriter's stake in one pool
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolPosition {
    /// Capital backing the pool
    pub pledge: i128,
    /// Loss accumulator at the last realization
    pub loss_snapshot: i128,
    /// Premium accumulator at the last settlement
    pub premium_snapshot: i128,
    /// Distressed-asset accumulator at the last settlement
    pub distressed_snapshot: i128,
    /// Settled but unclaimed premium
    pub pending_premium: i128,
    /// Settled but unclaimed distressed assets
    pub pending_distressed: i128,
    /// Capital reserved for queued capital pool withdrawals
    pub reserved: i128,
}

/// Per-pool reward accumulators and the pledge they are spread over
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolAccrual {
    /// Sum of position pledges, before pending losses are realized
    pub total_pledge: i128,
    /// Premium per unit pledge (1e18 fixed point)
    pub premium_per_pledge: i128,
    /// Distressed assets per unit pledge (1e18 fixed point)
    pub distressed_per_pledge: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeallocationRequest {
    /// Pledge reserved for release
    pub amount: i128,
    pub requested_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingRewards {
    pub premium: i128,
    pub distressed: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    CapitalPool,
    PoolRegistry,
    LossDistributor,
    PolicyBook,
    Backstop,
    UnderlyingAsset,
    MaxAllocations,
    ClaimFeeBps,
    DeallocationNoticePeriod,
    Underwriter(Address),
    Position(Address, u32),         // (underwriter, pool_id)
    PoolUnderwriters(u32),          // pool_id → dense Vec<Address>
    UnderwriterIndex(u32, Address), // (pool_id, underwriter) → slot in PoolUnderwriters
    PoolAccrual(u32),
    DeallocationRequest(Address, u32),
    Initialized,
}

pub struct Storage;

impl Storage {
    /// Configured contract address, e.g. `DataKey::PoolRegistry`
    pub fn address(env: &Env, key: &DataKey) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(key)
            .ok_or(Error::NotInitialized)
    }

    // Underwriters
    pub fn get_info(env: &Env, underwriter: &Address) -> Option<UnderwriterInfo> {
        env.storage()
            .persistent()
            .get(&DataKey::Underwriter(underwriter.clone()))
    }

    /// Saves the record, or drops it once nothing is pledged or allocated
    pub fn set_info(env: &Env, underwriter: &Address, info: &UnderwriterInfo) {
        let key = DataKey::Underwriter(underwriter.clone());
        if info.total_pledge <= 0 && info.allocations.is_empty() {
            env.storage().persistent().remove(&key);
        } else {
            env.storage().persistent().set(&key, info);
        }
    }

    // Positions
    pub fn get_position(env: &Env, underwriter: &Address, pool_id: u32) -> Option<PoolPosition> {
        env.storage()
            .persistent()
            .get(&DataKey::Position(underwriter.clone(), pool_id))
    }

    pub fn set_position(env: &Env, underwriter: &Address, pool_id: u32, position: &PoolPosition) {
        env.storage()
            .persistent()
            .set(&DataKey::Position(underwriter.clone(), pool_id), position);
    }

    pub fn remove_position(env: &Env, underwriter: &Address, pool_id: u32) {
        env.storage()
            .persistent()
            .remove(&DataKey::Position(underwriter.clone(), pool_id));
    }

    // Pool accruals
    pub fn get_accrual(env: &Env, pool_id: u32) -> PoolAccrual {
        env.storage()
            .persistent()
            .get(&DataKey::PoolAccrual(pool_id))
            .unwrap_or_default()
    }

    pub fn set_accrual(env: &Env, pool_id: u32, accrual: &PoolAccrual) {
        env.storage()
            .persistent()
            .set(&DataKey::PoolAccrual(pool_id), accrual);
    }

    // Deallocation requests
    pub fn get_deallocation(env: &Env, underwriter: &Address, pool_id: u32) -> Option<DeallocationRequest> {
        env.storage()
            .persistent()
            .get(&DataKey::DeallocationRequest(underwriter.clone(), pool_id))
    }

    pub fn set_deallocation(
        env: &Env,
        underwriter: &Address,
        pool_id: u32,
        request: &DeallocationRequest,
    ) {
        env.storage()
            .persistent()
            .set(&DataKey::DeallocationRequest(underwriter.clone(), pool_id), request);
    }

    pub fn remove_deallocation(env: &Env, underwriter: &Address, pool_id: u32) {
        env.storage()
            .persistent()
            .remove(&DataKey::DeallocationRequest(underwriter.clone(), pool_id));
    }

    // Pool underwriter index
    pub fn pool_underwriters(env: &Env, pool_id: u32) -> Vec<Address> {
        env.storage()
            .persistent()
            .get(&DataKey::PoolUnderwriters(pool_id))
            .unwrap_or(Vec::new(env))
    }

    pub fn pool_index(env: &Env, pool_id: u32, underwriter: &Address) -> Option<u32> {
        env.storage()
            .persistent()
            .get(&DataKey::UnderwriterIndex(pool_id, underwriter.clone()))
    }

    pub fn add_to_pool(env: &Env, pool_id: u32, underwriter: &Address) {
        if Self::pool_index(env, pool_id, underwriter).is_some() {
            return;
        }
        let mut list = Self::pool_underwriters(env, pool_id);
        env.storage().persistent().set(
            &DataKey::UnderwriterIndex(pool_id, underwriter.clone()),
            &list.len(),
        );
        list.push_back(underwriter.clone());
        env.storage()
            .persistent()
            .set(&DataKey::PoolUnderwriters(pool_id), &list);
    }

    /// Swap-and-pop removal; the moved entry's index is rewritten
    pub fn remove_from_pool(env: &Env, pool_id: u32, underwriter: &Address) {
        let Some(index) = Self::pool_index(env, pool_id, underwriter) else {
            return;
        };
        let mut list = Self::pool_underwriters(env, pool_id);
        let last = list.len() - 1;
        if index != last {
            if let Some(moved) = list.get(last) {
                list.set(index, moved.clone());
                env.storage()
                    .persistent()
                    .set(&DataKey::UnderwriterIndex(pool_id, moved), &index);
            }
        }
        list.pop_back();

        env.storage()
            .persistent()
            .set(&DataKey::PoolUnderwriters(pool_id), &list);
        env.storage()
            .persistent()
            .remove(&DataKey::UnderwriterIndex(pool_id, underwriter.clone()));
    }
}

use soroban_sdk::contracttype;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    RiskManager,
    PoolCount,
    /// pool_id → PoolData
    Pool(u32),
    /// pool_id → Map<adapter, capital>
    PoolAdapters(u32),
    Initialized,
}

use soroban_sdk::contracttype;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    RiskManager,
    /// pool_id → cumulative loss per unit pledge (1e18 fixed point)
    LossPerPledge(u32),
    Initialized,
}

use soroban_sdk::{contracttype, Address};

#[contracttype]
#[derive(Clone, Debug)]
pub struct LossRecordedEvent {
    pub pool_id: u32,
    pub amount: i128,
    pub total_pledge: i128,
    /// Accumulator value after the loss
    pub cumulative_loss_per_pledge: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RiskManagerSetEvent {
    pub risk_manager: Address,
}

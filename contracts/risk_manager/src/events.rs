use soroban_sdk::{contracttype, Address};

#[contracttype]
#[derive(Clone, Debug)]
pub struct ProtocolPoolAddedEvent {
    pub pool_id: u32,
    pub protocol_token: Address,
    pub scale: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CapitalAllocatedEvent {
    pub underwriter: Address,
    pub pool_id: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct DeallocationRequestedEvent {
    pub underwriter: Address,
    pub pool_id: u32,
    pub amount: i128,
    pub requested_at: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct DeallocationCancelledEvent {
    pub underwriter: Address,
    pub pool_id: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CapitalDeallocatedEvent {
    pub underwriter: Address,
    pub pool_id: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct LossesRealizedEvent {
    pub underwriter: Address,
    pub applied: i128,
    pub written_off: i128,
    pub remaining_pledge: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimProcessedEvent {
    pub policy_id: u64,
    pub pool_id: u32,
    pub claimant: Address,
    pub net_payout: i128,
    pub fee: i128,
    pub from_backstop: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct PremiumDistributedEvent {
    pub pool_id: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RewardsClaimedEvent {
    pub underwriter: Address,
    pub pool_id: u32,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct UnderwriterLiquidatedEvent {
    pub underwriter: Address,
    pub liquidator: Address,
    pub losses: i128,
}

use soroban_sdk::{contracttype, Address};

#[contracttype]
#[derive(Clone, Debug)]
pub struct PoolAddedEvent {
    pub pool_id: u32,
    pub protocol_token: Address,
    pub scale: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct PoolPausedEvent {
    pub pool_id: u32,
    pub paused: bool,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimLossRecordedEvent {
    pub pool_id: u32,
    pub amount: i128,
    pub capital_pledged: i128,
}

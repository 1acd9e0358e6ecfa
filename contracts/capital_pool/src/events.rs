use soroban_sdk::{contracttype, Address, Symbol};

#[contracttype]
#[derive(Clone, Debug)]
pub struct DepositEvent {
    pub underwriter: Address,
    pub amount: i128,
    pub shares_minted: i128,
    pub yield_choice: u32,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct WithdrawalRequestedEvent {
    pub underwriter: Address,
    pub index: u32,
    pub shares: i128,
    pub principal_component: i128,
    pub requested_at: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct WithdrawalCancelledEvent {
    pub underwriter: Address,
    pub index: u32,
    pub shares: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct WithdrawalExecutedEvent {
    pub underwriter: Address,
    pub value: i128,
    pub shares_burned: i128,
    pub principal_removed: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct LossesAppliedEvent {
    pub underwriter: Address,
    pub applied: i128,
    pub shares_burned: i128,
    pub wiped_out: bool,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct PayoutExecutedEvent {
    pub claimant: Address,
    pub claimant_amount: i128,
    pub fee_amount: i128,
    pub from_adapters: i128,
    pub from_backstop: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct SystemValueSyncedEvent {
    pub new_value: i128,
    pub old_value: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct AdapterCallFailedEvent {
    pub adapter: Address,
    pub function: Symbol,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct AdapterSetEvent {
    pub yield_choice: u32,
    pub adapter: Address,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct LossesWrittenOffEvent {
    pub amount: i128,
    pub new_value: i128,
}

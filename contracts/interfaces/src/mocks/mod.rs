//! In-memory collaborators for tests: a yield adapter, a backstop pool and a
//! policy book. Only compiled with the `testutils` feature.
//!
//! Each contract lives in its own module so the generated entry points do
//! not collide.

mod backstop;
mod policy_book;
mod yield_adapter;

pub use backstop::{MockBackstop, MockBackstopClient};
pub use policy_book::{MockPolicyBook, MockPolicyBookClient};
pub use yield_adapter::{MockYieldAdapter, MockYieldAdapterClient};

use soroban_sdk::{contracterror, contracttype, token, Address, Env};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MockError {
    NotInitialized = 1,
    /// Failure injected by the test
    Injected = 2,
}

#[contracttype]
#[derive(Clone)]
pub(crate) enum MockKey {
    Asset,
    RiskManager,
    FailWithdraw,
    FailEmergency,
    FailValue,
    Deposited,
    DrawCount,
    TotalDrawn,
    NextPolicyId,
    Policy(u64),
}

pub(crate) fn asset(env: &Env) -> Result<Address, MockError> {
    env.storage()
        .instance()
        .get(&MockKey::Asset)
        .ok_or(MockError::NotInitialized)
}

pub(crate) fn flag(env: &Env, key: &MockKey) -> bool {
    env.storage().instance().get(key).unwrap_or(false)
}

pub(crate) fn send_available(
    env: &Env,
    recipient: &Address,
    amount: i128,
) -> Result<i128, MockError> {
    let client = token::Client::new(env, &asset(env)?);
    let balance = client.balance(&env.current_contract_address());
    let sent = amount.min(balance).max(0);
    if sent > 0 {
        client.transfer(&env.current_contract_address(), recipient, &sent);
    }
    Ok(sent)
}

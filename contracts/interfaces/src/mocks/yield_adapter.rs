use soroban_sdk::{contract, contractimpl, token, Address, Env};

use super::{asset, flag, send_available, MockError, MockKey};

/// Holds tokens directly. Yield is simulated by minting to its address.
#[contract]
pub struct MockYieldAdapter;

#[contractimpl]
impl MockYieldAdapter {
    pub fn initialize(env: Env, asset: Address) {
        env.storage().instance().set(&MockKey::Asset, &asset);
    }

    pub fn set_fail_withdraw(env: Env, fail: bool) {
        env.storage().instance().set(&MockKey::FailWithdraw, &fail);
    }

    pub fn set_fail_emergency(env: Env, fail: bool) {
        env.storage().instance().set(&MockKey::FailEmergency, &fail);
    }

    pub fn set_fail_value(env: Env, fail: bool) {
        env.storage().instance().set(&MockKey::FailValue, &fail);
    }

    pub fn deposit(env: Env, amount: i128) -> Result<(), MockError> {
        let total: i128 = env
            .storage()
            .instance()
            .get(&MockKey::Deposited)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&MockKey::Deposited, &(total + amount));
        Ok(())
    }

    pub fn withdraw(env: Env, amount: i128, recipient: Address) -> Result<i128, MockError> {
        if flag(&env, &MockKey::FailWithdraw) {
            return Err(MockError::Injected);
        }
        send_available(&env, &recipient, amount)
    }

    pub fn current_value_held(env: Env) -> Result<i128, MockError> {
        if flag(&env, &MockKey::FailValue) {
            return Err(MockError::Injected);
        }
        let client = token::Client::new(&env, &asset(&env)?);
        Ok(client.balance(&env.current_contract_address()))
    }

    pub fn underlying_asset(env: Env) -> Result<Address, MockError> {
        asset(&env)
    }

    pub fn emergency_transfer(
        env: Env,
        recipient: Address,
        amount: i128,
    ) -> Result<i128, MockError> {
        if flag(&env, &MockKey::FailEmergency) {
            return Err(MockError::Injected);
        }
        send_available(&env, &recipient, amount)
    }

    /// Sum of amounts reported through `deposit`
    pub fn total_deposited(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&MockKey::Deposited)
            .unwrap_or(0)
    }
}

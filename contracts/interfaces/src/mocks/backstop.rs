use soroban_sdk::{contract, contractimpl, Address, Env};

use super::{send_available, MockError, MockKey};

/// Pays out of its own token balance and counts draws
#[contract]
pub struct MockBackstop;

#[contractimpl]
impl MockBackstop {
    pub fn initialize(env: Env, asset: Address) {
        env.storage().instance().set(&MockKey::Asset, &asset);
    }

    pub fn draw_fund(env: Env, amount: i128, recipient: Address) -> Result<i128, MockError> {
        let sent = send_available(&env, &recipient, amount)?;

        let count: u32 = env
            .storage()
            .instance()
            .get(&MockKey::DrawCount)
            .unwrap_or(0);
        let drawn: i128 = env
            .storage()
            .instance()
            .get(&MockKey::TotalDrawn)
            .unwrap_or(0);
        env.storage().instance().set(&MockKey::DrawCount, &(count + 1));
        env.storage()
            .instance()
            .set(&MockKey::TotalDrawn, &(drawn + sent));

        Ok(sent)
    }

    pub fn draw_count(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&MockKey::DrawCount)
            .unwrap_or(0)
    }

    pub fn total_drawn(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&MockKey::TotalDrawn)
            .unwrap_or(0)
    }
}

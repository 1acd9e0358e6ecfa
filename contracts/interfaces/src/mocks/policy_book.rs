use soroban_sdk::{contract, contractimpl, token, Address, Env};

use super::{asset, MockError, MockKey};
use crate::clients::PolicyHooksClient;
use crate::types::PolicyRecord;

/// Issues policies and forwards sales and premiums to the risk manager
#[contract]
pub struct MockPolicyBook;

#[contractimpl]
impl MockPolicyBook {
    pub fn initialize(env: Env, risk_manager: Address, asset: Address) {
        env.storage()
            .instance()
            .set(&MockKey::RiskManager, &risk_manager);
        env.storage().instance().set(&MockKey::Asset, &asset);
    }

    /// Records a policy and reports the coverage sale
    pub fn issue_policy(
        env: Env,
        owner: Address,
        pool_id: u32,
        coverage: i128,
        activation: u64,
        last_paid_until: u64,
    ) -> Result<u64, MockError> {
        let risk_manager: Address = env
            .storage()
            .instance()
            .get(&MockKey::RiskManager)
            .ok_or(MockError::NotInitialized)?;

        let id: u64 = env
            .storage()
            .instance()
            .get(&MockKey::NextPolicyId)
            .unwrap_or(1);
        env.storage()
            .instance()
            .set(&MockKey::NextPolicyId, &(id + 1));

        let policy = PolicyRecord {
            id,
            owner,
            pool_id,
            coverage,
            activation,
            last_paid_until,
        };
        env.storage()
            .persistent()
            .set(&MockKey::Policy(id), &policy);

        PolicyHooksClient::new(&env, &risk_manager).update_coverage_sold(
            &env.current_contract_address(),
            &pool_id,
            &coverage,
            &true,
        );

        Ok(id)
    }

    /// Moves premium from `payer` to the risk manager and notifies it
    pub fn pay_premium(
        env: Env,
        payer: Address,
        pool_id: u32,
        amount: i128,
    ) -> Result<(), MockError> {
        payer.require_auth();
        let risk_manager: Address = env
            .storage()
            .instance()
            .get(&MockKey::RiskManager)
            .ok_or(MockError::NotInitialized)?;

        token::Client::new(&env, &asset(&env)?).transfer(&payer, &risk_manager, &amount);
        PolicyHooksClient::new(&env, &risk_manager).distribute_premium(
            &env.current_contract_address(),
            &pool_id,
            &amount,
        );
        Ok(())
    }

    pub fn set_paid_until(env: Env, policy_id: u64, last_paid_until: u64) {
        let key = MockKey::Policy(policy_id);
        if let Some(mut policy) = env.storage().persistent().get::<_, PolicyRecord>(&key) {
            policy.last_paid_until = last_paid_until;
            env.storage().persistent().set(&key, &policy);
        }
    }

    pub fn get_policy(env: Env, policy_id: u64) -> Option<PolicyRecord> {
        env.storage().persistent().get(&MockKey::Policy(policy_id))
    }

    pub fn close_policy(env: Env, caller: Address, policy_id: u64) {
        caller.require_auth();
        env.storage()
            .persistent()
            .remove(&MockKey::Policy(policy_id));
    }
}

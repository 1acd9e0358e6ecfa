//! Cross-contract seams. Each trait only generates a client; implementors
//! expose functions with matching names and arguments.

use soroban_sdk::{contractclient, Address, Env, Map};

use crate::types::{
    PayoutData, PolicyRecord, PoolData, RateCurve, RealizedLoss, UnderwriterAccount,
};

/// Yield venue holding deposited capital.
///
/// The capital pool transfers tokens to the adapter before calling `deposit`.
#[contractclient(name = "YieldAdapterClient")]
pub trait YieldAdapterInterface {
    fn deposit(env: Env, amount: i128);

    /// Sends up to `amount` to `recipient`, returning what was sent
    fn withdraw(env: Env, amount: i128, recipient: Address) -> i128;

    fn current_value_held(env: Env) -> i128;

    fn underlying_asset(env: Env) -> Address;

    /// Direct token transfer bypassing the venue, used when `withdraw` fails
    fn emergency_transfer(env: Env, recipient: Address, amount: i128) -> i128;
}

/// Callbacks the capital pool makes into the risk manager.
///
/// Hooks returning [`RealizedLoss`] report losses realized on the pool's
/// behalf; the capital pool applies them itself since the risk manager cannot
/// call back.
#[contractclient(name = "RiskManagerHooksClient")]
pub trait RiskManagerHooks {
    fn on_capital_deposited(
        env: Env,
        caller: Address,
        underwriter: Address,
        amount: i128,
    ) -> RealizedLoss;

    /// Returns the pledge reserved in each pool for this request
    fn on_withdrawal_requested(
        env: Env,
        caller: Address,
        underwriter: Address,
        principal_component: i128,
    ) -> Map<u32, i128>;

    fn on_withdrawal_cancelled(
        env: Env,
        caller: Address,
        underwriter: Address,
        reservations: Map<u32, i128>,
    );

    fn on_withdrawal_executing(env: Env, caller: Address, underwriter: Address) -> RealizedLoss;

    fn on_capital_withdrawn(
        env: Env,
        caller: Address,
        underwriter: Address,
        principal_removed: i128,
        reservations: Map<u32, i128>,
        is_full_withdrawal: bool,
    );
}

/// Calls the policy book makes into the risk manager
#[contractclient(name = "PolicyHooksClient")]
pub trait PolicyHooks {
    fn update_coverage_sold(env: Env, caller: Address, pool_id: u32, amount: i128, is_sale: bool);

    /// Notifies the risk manager of premium already transferred to it
    fn distribute_premium(env: Env, caller: Address, pool_id: u32, amount: i128);
}

#[contractclient(name = "CapitalLedgerClient")]
pub trait CapitalLedgerInterface {
    fn apply_losses(env: Env, caller: Address, underwriter: Address, loss: i128);

    /// Drops paid-out value no pledge is left to bear from NAV
    fn write_off_losses(env: Env, caller: Address, amount: i128);

    /// Returns the amount collected from adapters
    fn execute_payout(env: Env, caller: Address, payout: PayoutData) -> i128;

    fn get_underwriter_account(env: Env, underwriter: Address) -> Option<UnderwriterAccount>;

    fn shares_to_value(env: Env, shares: i128) -> i128;
}

#[contractclient(name = "LossDistributorClient")]
pub trait LossDistributorInterface {
    fn record_loss(env: Env, caller: Address, pool_id: u32, amount: i128, total_pledge: i128);

    fn pending_loss(env: Env, pool_id: u32, pledge: i128, snapshot: i128) -> i128;

    fn accumulator(env: Env, pool_id: u32) -> i128;
}

#[contractclient(name = "PoolRegistryClient")]
pub trait PoolRegistryInterface {
    fn add_pool(
        env: Env,
        caller: Address,
        protocol_token: Address,
        scale: i128,
        rate_curve: RateCurve,
        fee_recipient: Address,
    ) -> u32;

    fn get_pool_data(env: Env, pool_id: u32) -> Option<PoolData>;

    fn get_pool_count(env: Env) -> u32;

    fn get_pool_adapters(env: Env, pool_id: u32) -> Map<Address, i128>;

    fn update_capital_allocation(
        env: Env,
        caller: Address,
        pool_id: u32,
        adapter: Address,
        amount: i128,
        is_allocation: bool,
    );

    fn update_pending_withdrawal(
        env: Env,
        caller: Address,
        pool_id: u32,
        amount: i128,
        is_request: bool,
    );

    fn update_coverage_sold(env: Env, caller: Address, pool_id: u32, amount: i128, is_sale: bool);

    fn record_claim_loss(env: Env, caller: Address, pool_id: u32, amount: i128);

    fn set_pause_state(env: Env, caller: Address, pool_id: u32, paused: bool);

    fn set_fee_recipient(env: Env, caller: Address, pool_id: u32, recipient: Address);
}

#[contractclient(name = "PolicyBookClient")]
pub trait PolicyBookInterface {
    fn get_policy(env: Env, policy_id: u64) -> Option<PolicyRecord>;

    fn close_policy(env: Env, caller: Address, policy_id: u64);
}

/// Reserve drawn when LP capital cannot cover a claim
#[contractclient(name = "BackstopClient")]
pub trait BackstopInterface {
    fn draw_fund(env: Env, amount: i128, recipient: Address) -> i128;
}

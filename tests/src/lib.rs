//! Fixture wiring the capital pool, risk manager, loss distributor and pool
//! registry together with mock adapter, backstop and policy book contracts.

use capital_interfaces::mocks::{
    MockBackstop, MockBackstopClient, MockPolicyBook, MockPolicyBookClient, MockYieldAdapter,
    MockYieldAdapterClient,
};
use capital_interfaces::RateCurve;
use capital_pool::{CapitalPool, CapitalPoolClient};
use loss_distributor::{LossDistributor, LossDistributorClient};
use pool_registry::{PoolRegistry, PoolRegistryClient};
use risk_manager::{RiskManager, RiskManagerClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::token::{self, StellarAssetClient};
use soroban_sdk::{Address, Env, Vec};

pub const NOTICE_PERIOD: u64 = 7 * 24 * 60 * 60;
pub const START_TIME: u64 = 1_000;

pub struct TestContext {
    pub env: Env,
    pub admin: Address,
    pub fee_recipient: Address,
    pub underlying: Address,
    pub protocol_token: Address,
    pub capital_pool: CapitalPoolClient<'static>,
    pub risk_manager: RiskManagerClient<'static>,
    pub registry: PoolRegistryClient<'static>,
    pub loss_distributor: LossDistributorClient<'static>,
    pub adapter: MockYieldAdapterClient<'static>,
    pub backstop: MockBackstopClient<'static>,
    pub policy_book: MockPolicyBookClient<'static>,
}

/// 2% base, 10% to an 80% kink, 50% above it
pub fn default_curve() -> RateCurve {
    RateCurve {
        base_rate_bps: 200,
        slope1_bps: 1_000,
        slope2_bps: 5_000,
        kink_bps: 8_000,
    }
}

/// Deploy and wire every contract, with pools 0 and 1 registered
pub fn setup_test() -> TestContext {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(START_TIME);

    let admin = Address::generate(&env);
    let fee_recipient = Address::generate(&env);
    let underlying = env
        .register_stellar_asset_contract_v2(admin.clone())
        .address();
    let protocol_token = env
        .register_stellar_asset_contract_v2(admin.clone())
        .address();

    // Deploy contracts
    let capital_pool = CapitalPoolClient::new(&env, &env.register(CapitalPool, ()));
    let risk_manager = RiskManagerClient::new(&env, &env.register(RiskManager, ()));
    let registry = PoolRegistryClient::new(&env, &env.register(PoolRegistry, ()));
    let loss_distributor = LossDistributorClient::new(&env, &env.register(LossDistributor, ()));
    let adapter = MockYieldAdapterClient::new(&env, &env.register(MockYieldAdapter, ()));
    let backstop = MockBackstopClient::new(&env, &env.register(MockBackstop, ()));
    let policy_book = MockPolicyBookClient::new(&env, &env.register(MockPolicyBook, ()));

    adapter.initialize(&underlying);
    backstop.initialize(&underlying);
    policy_book.initialize(&risk_manager.address, &underlying);

    capital_pool.initialize(&admin, &underlying, &NOTICE_PERIOD);
    capital_pool.set_base_yield_adapter(&0, &adapter.address);
    capital_pool.set_risk_manager(&risk_manager.address);
    capital_pool.set_backstop_pool(&backstop.address);

    registry.initialize(&admin, &risk_manager.address);
    loss_distributor.initialize(&admin, &risk_manager.address);

    risk_manager.initialize(
        &admin,
        &capital_pool.address,
        &registry.address,
        &loss_distributor.address,
        &policy_book.address,
        &backstop.address,
        &underlying,
    );
    risk_manager.add_protocol_risk_pool(&protocol_token, &default_curve(), &fee_recipient);
    risk_manager.add_protocol_risk_pool(&protocol_token, &default_curve(), &fee_recipient);

    TestContext {
        env,
        admin,
        fee_recipient,
        underlying,
        protocol_token,
        capital_pool,
        risk_manager,
        registry,
        loss_distributor,
        adapter,
        backstop,
        policy_book,
    }
}

impl TestContext {
    pub fn now(&self) -> u64 {
        self.env.ledger().timestamp()
    }

    pub fn advance(&self, seconds: u64) {
        self.env.ledger().set_timestamp(self.now() + seconds);
    }

    pub fn mint(&self, to: &Address, amount: i128) {
        StellarAssetClient::new(&self.env, &self.underlying).mint(to, &amount);
    }

    pub fn balance(&self, of: &Address) -> i128 {
        token::Client::new(&self.env, &self.underlying).balance(of)
    }

    pub fn protocol_balance(&self, of: &Address) -> i128 {
        token::Client::new(&self.env, &self.protocol_token).balance(of)
    }

    pub fn fund_backstop(&self, amount: i128) {
        self.mint(&self.backstop.address, amount);
    }

    /// Fresh underwriter with `amount` deposited and allocated to `pools`
    pub fn underwriter(&self, amount: i128, pools: &[u32]) -> Address {
        let underwriter = Address::generate(&self.env);
        self.mint(&underwriter, amount);
        self.capital_pool.deposit(&underwriter, &amount, &0);
        if !pools.is_empty() {
            self.allocate(&underwriter, pools);
        }
        underwriter
    }

    pub fn allocate(&self, underwriter: &Address, pools: &[u32]) {
        let mut ids = Vec::new(&self.env);
        for id in pools {
            ids.push_back(*id);
        }
        self.risk_manager.allocate_capital(underwriter, &ids);
    }

    /// Policy paid up to now, with the claimant holding the distressed assets
    pub fn policy(&self, owner: &Address, pool_id: u32, coverage: i128) -> u64 {
        StellarAssetClient::new(&self.env, &self.protocol_token).mint(owner, &coverage);
        self.policy_book
            .issue_policy(owner, &pool_id, &coverage, &self.now(), &self.now())
    }

    pub fn shares(&self, underwriter: &Address) -> i128 {
        self.capital_pool
            .get_underwriter_account(underwriter)
            .map(|a| a.shares)
            .unwrap_or(0)
    }

    pub fn principal(&self, underwriter: &Address) -> i128 {
        self.capital_pool
            .get_underwriter_account(underwriter)
            .map(|a| a.principal)
            .unwrap_or(0)
    }

    pub fn capital_pledged(&self, pool_id: u32) -> i128 {
        self.registry
            .get_pool_data(&pool_id)
            .map(|p| p.capital_pledged)
            .unwrap_or(0)
    }
}

use soroban_sdk::{contracttype, Address, Map, Vec};

/// Kinked annual premium curve, all values in basis points
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateCurve {
    /// Rate charged at zero utilization
    pub base_rate_bps: i128,
    /// Slope applied below the kink
    pub slope1_bps: i128,
    /// Slope applied above the kink
    pub slope2_bps: i128,
    /// Utilization at which the curve steepens
    pub kink_bps: i128,
}

/// Aggregate state of one risk pool
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolData {
    /// Token of the covered protocol, paid out to underwriters as distressed assets
    pub protocol_token: Address,
    /// 10^(protocol decimals - underlying decimals), at least 1
    pub scale: i128,
    /// Sum of all underwriter pledges backing the pool
    pub capital_pledged: i128,
    /// Outstanding coverage sold against the pool
    pub coverage_sold: i128,
    /// Capital reserved by pending withdrawals and deallocations
    pub pending_withdrawal: i128,
    pub is_paused: bool,
    /// Timestamp of the last pause, 0 when never paused
    pub paused_at: u64,
    /// Receives the claim fee
    pub fee_recipient: Address,
    pub rate_curve: RateCurve,
}

/// A queued withdrawal awaiting its notice period
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalRequest {
    /// Shares to redeem
    pub shares: i128,
    /// Principal share of the request at request time
    pub principal_component: i128,
    /// Pledge the risk manager reserved for this request, per pool
    pub reservations: Map<u32, i128>,
    /// Ledger timestamp of the request
    pub requested_at: u64,
}

/// Losses the risk manager realized for one underwriter
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RealizedLoss {
    /// Charged to the underwriter's principal
    pub charged: i128,
    /// Paid out of adapters but chargeable to no remaining pledge
    pub written_off: i128,
}

impl RealizedLoss {
    pub fn is_empty(&self) -> bool {
        self.charged <= 0 && self.written_off <= 0
    }
}

/// Capital provider account held by the capital pool
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnderwriterAccount {
    /// Deposited value still owned, net of realized losses
    pub principal: i128,
    /// NAV shares owned
    pub shares: i128,
    /// Yield venue chosen at first deposit
    pub yield_choice: u32,
    /// Adapter holding the account's capital
    pub adapter: Address,
    pub withdrawal_requests: Vec<WithdrawalRequest>,
}

/// Instructions for a claim payout funded by pool LPs
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutData {
    pub claimant: Address,
    pub claimant_amount: i128,
    pub fee_recipient: Address,
    pub fee_amount: i128,
    /// Adapters backing the pool, parallel to `capital_per_adapter`
    pub adapters: Vec<Address>,
    pub capital_per_adapter: Vec<i128>,
    /// Pool capital at claim time; the payout may not exceed it
    pub total_capital_from_pool_lps: i128,
}

/// Insurance policy as recorded by the policy book
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyRecord {
    pub id: u64,
    pub owner: Address,
    pub pool_id: u32,
    /// Coverage amount in underlying units
    pub coverage: i128,
    /// Coverage starts at this timestamp
    pub activation: u64,
    /// Premium is settled up to this timestamp
    pub last_paid_until: u64,
}

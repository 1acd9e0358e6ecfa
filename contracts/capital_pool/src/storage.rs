use soroban_sdk::{contracttype, Address};

/// Default withdrawal notice period
pub const DEFAULT_NOTICE_PERIOD: u64 = 30 * 24 * 60 * 60; // 30 days

/// System-wide NAV accounting
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SystemLedger {
    /// Value backing all shares
    pub total_system_value: i128,
    /// Shares outstanding
    pub total_system_shares: i128,
    /// Claim money paid out of adapters whose losses are not yet realized
    pub unrealized_losses: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    UnderlyingAsset,
    RiskManager,
    BackstopPool,
    NoticePeriod,
    Ledger,
    BaseYieldAdapter(u32), // yield_choice → adapter
    ActiveAdapters,
    Account(Address),
    Initialized,
}

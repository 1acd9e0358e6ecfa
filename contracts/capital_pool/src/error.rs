use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ============================================
    // INITIALIZATION ERRORS (1-9)
    // ============================================
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,
    /// Risk manager can only be set once
    RiskManagerAlreadySet = 3,
    /// Risk manager not configured yet
    RiskManagerNotSet = 4,

    // ============================================
    // AUTHORIZATION ERRORS (10-19)
    // ============================================
    /// Caller is not the configured risk manager
    NotRiskManager = 10,

    // ============================================
    // DEPOSIT ERRORS (20-29)
    // ============================================
    /// Amount must be positive
    InvalidAmount = 20,
    /// No adapter registered for the yield choice
    AdapterNotConfigured = 21,
    /// Adapter manages a different token
    AdapterAssetMismatch = 22,
    /// Existing account uses a different yield choice
    InvalidState = 23,
    /// Deposit too small to mint a share at the current NAV
    NoSharesToMint = 24,

    // ============================================
    // WITHDRAWAL ERRORS (30-39)
    // ============================================
    /// Request exceeds unrequested shares
    InsufficientShares = 30,
    /// No request at the given index
    NoWithdrawalRequest = 31,
    /// Notice period has not elapsed
    NoticePeriodActive = 32,
    /// Underwriter has no deposit
    NoActiveDeposit = 33,

    // ============================================
    // STATE CONSISTENCY ERRORS (40-59)
    // ============================================
    /// Request no longer backed by the account's shares
    InconsistentState = 40,
    /// Nested entry into a guarded operation
    Reentrant = 41,
    /// Payout larger than the pool's LP capital
    PayoutExceedsPoolCapital = 42,
    /// Adapter and capital lists differ in length
    InvalidPayoutData = 43,

    // ============================================
    // FUND MOVEMENT ERRORS (60-69)
    // ============================================
    /// Adapter failed or returned less than owed
    InsufficientFunds = 60,
    /// Adapters and backstop together fell short of the payout
    InsufficientFundsGathered = 61,

    // ============================================
    // INVARIANT ERRORS (70-79)
    // ============================================
    /// Shares outstanding with zero system value
    InvariantViolation = 70,
    /// Arithmetic overflow
    Overflow = 71,
}

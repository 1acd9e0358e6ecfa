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
    /// Configuration value out of range
    InvalidConfig = 3,

    // ============================================
    // AUTHORIZATION ERRORS (10-19)
    // ============================================
    /// Caller is not the capital pool
    NotCapitalLedger = 10,
    /// Caller is not the policy book
    NotPolicyBook = 11,
    /// Claimant does not own the policy
    NotPolicyOwner = 12,

    // ============================================
    // ALLOCATION ERRORS (20-29)
    // ============================================
    /// Underwriter has nothing pledged
    NoCapitalToAllocate = 20,
    /// Too many pools, or none requested
    ExceedsMaxAllocations = 21,
    /// Pool does not exist
    InvalidPoolId = 22,
    /// Pool is paused
    PoolPaused = 23,
    /// Already allocated to the pool
    AlreadyAllocated = 24,
    /// Not allocated to the pool
    NotAllocated = 25,
    /// Amount out of range
    InvalidAmount = 26,

    // ============================================
    // CAPACITY & NOTICE ERRORS (30-39)
    // ============================================
    /// One deallocation request per pool at a time
    DeallocationRequestPending = 30,
    /// No deallocation request for the pool
    NoDeallocationRequest = 31,
    /// Notice period has not elapsed
    NoticePeriodActive = 32,
    /// Release would leave sold coverage uncollateralized
    InsufficientFreeCapital = 33,
    /// Sale exceeds the pool's free capital
    InsufficientCapacity = 34,

    // ============================================
    // CLAIM ERRORS (40-49)
    // ============================================
    /// Policy book has no such policy
    PolicyNotFound = 40,
    /// Policy not yet active or has no coverage
    PolicyNotActive = 41,
    /// Premium owed must be settled first
    PremiumsOutstanding = 42,
    /// Backstop paid less than requested
    BackstopShortfall = 43,
    /// Nothing pledged to receive premium
    NoCapitalInPool = 44,

    // ============================================
    // REWARD & LIQUIDATION ERRORS (50-59)
    // ============================================
    /// Nothing accrued
    NoRewardsToClaim = 50,
    /// Pending losses do not exceed share value
    NotInsolvent = 51,
    /// Nested entry into a guarded operation
    Reentrant = 52,

    // ============================================
    // ARITHMETIC ERRORS (70-79)
    // ============================================
    /// Arithmetic overflow
    Overflow = 70,
}

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

    // ============================================
    // AUTHORIZATION ERRORS (10-19)
    // ============================================
    /// Caller is not the configured risk manager
    NotRiskManager = 10,

    // ============================================
    // VALIDATION ERRORS (20-39)
    // ============================================
    /// Amount must be non-negative
    InvalidAmount = 20,
    /// Pool does not exist
    InvalidPoolId = 21,
    /// Scale must be positive
    InvalidScale = 22,

    // ============================================
    // ARITHMETIC ERRORS (70-79)
    // ============================================
    /// Pool total overflowed
    Overflow = 70,
}

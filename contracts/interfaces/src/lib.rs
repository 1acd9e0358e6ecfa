#![no_std]

//! Shared records, cross-contract clients and helpers for the capital pool,
//! risk manager, loss distributor and pool registry contracts.

pub mod clients;
pub mod guard;
pub mod math;
pub mod types;

#[cfg(any(test, feature = "testutils"))]
pub mod mocks;

pub use clients::*;
pub use guard::ReentrancyGuard;
pub use types::*;

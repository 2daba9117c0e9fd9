//! # occ-core: Foundational Types for the Occupancy Lifecycle
//!
//! Every other crate in the workspace depends on `occ-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `SpaceId`, `HandoverId`,
//!    `InspectionId`, `MaintenanceId`, `SettlementId`, `UserId`. You cannot
//!    pass an inspection id where a handover id is expected.
//!
//! 2. **Exact money.** `Amount` stores minor units. Floats are only accepted
//!    at the input boundary (`AmountInput`) and are rejected when negative,
//!    NaN, infinite, or more precise than two decimal places.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC, truncated to seconds.
//!    Calendar dates (move-in, handover, inspection) are `chrono::NaiveDate`.
//!
//! 4. **One error taxonomy.** `ValidationError`, `StateError`,
//!    `ConflictError`, `PersistenceError`, unified by `LifecycleError`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `occ-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::{Amount, AmountInput};
pub use error::{ConflictError, LifecycleError, PersistenceError, StateError, ValidationError};
pub use identity::{HandoverId, InspectionId, MaintenanceId, SettlementId, SpaceId, UserId};
pub use temporal::Timestamp;

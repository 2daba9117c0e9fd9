//! # Error Types
//!
//! Four failure classes, each surfaced to the caller unchanged:
//!
//! - [`ValidationError`]: malformed or missing input. The caller corrects
//!   the input and resubmits.
//! - [`StateError`]: operation invoked out of the allowed sequence. Never
//!   silently coerced.
//! - [`ConflictError`]: a concurrent transition changed the record first.
//!   The caller reloads and retries.
//! - [`PersistenceError`]: the storage collaborator failed. No partial
//!   state is committed.
//!
//! Nothing in the core retries internally; retry is caller policy.

use thiserror::Error;

/// Malformed or missing input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A monetary amount could not be accepted.
    #[error("invalid amount for {field}: {reason}")]
    InvalidAmount {
        /// Name of the amount field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A date that must be today or later lies in the past.
    #[error("{field} {date} is in the past (today is {today})")]
    DateInPast {
        /// Name of the date field.
        field: &'static str,
        /// The rejected date.
        date: chrono::NaiveDate,
        /// The reference date used for the check.
        today: chrono::NaiveDate,
    },

    /// Two dates are in the wrong order.
    #[error("{later_field} {later} precedes {earlier_field} {earlier}")]
    DateOrder {
        /// Field that must come first.
        earlier_field: &'static str,
        /// Its value.
        earlier: chrono::NaiveDate,
        /// Field that must come second.
        later_field: &'static str,
        /// Its value.
        later: chrono::NaiveDate,
    },

    /// Any other field-level rejection.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Shorthand for [`ValidationError::InvalidField`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Operation invoked out of the allowed sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {operation} while {state}: {reason}")]
pub struct StateError {
    /// The attempted operation (e.g. "complete handover").
    pub operation: String,
    /// The state the subject was in.
    pub state: String,
    /// Why the operation was rejected.
    pub reason: String,
}

impl StateError {
    /// Build a state error from its three parts.
    pub fn new(
        operation: impl Into<String>,
        state: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            state: state.to_string(),
            reason: reason.into(),
        }
    }
}

/// A concurrent transition changed the record before this one committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "conflict on space {space_id}: expected {expected_status}@r{expected_revision}, found {actual_status}@r{actual_revision}"
)]
pub struct ConflictError {
    /// The contested space.
    pub space_id: String,
    /// Status the caller expected.
    pub expected_status: String,
    /// Revision the caller expected.
    pub expected_revision: u64,
    /// Status actually stored.
    pub actual_status: String,
    /// Revision actually stored.
    pub actual_revision: u64,
}

/// Failure of the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The backend could not be reached or refused the operation.
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be interpreted.
    #[error("corrupt persisted state: {0}")]
    Corrupt(String),
}

/// Union of every error an orchestrated lifecycle operation can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Input rejected.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation out of sequence.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Concurrent modification detected.
    #[error("{0}")]
    Conflict(#[from] ConflictError),

    /// Storage failure.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),
}

impl LifecycleError {
    /// Whether the caller may reload and retry the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

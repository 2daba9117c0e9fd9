//! # occ-lifecycle: Occupancy Lifecycle Orchestration
//!
//! Turns the record and stage types of `occ-state` into a running
//! lifecycle: reads and writes go through an [`OccupancyStore`] with
//! compare-and-swap transitions, the [`LifecycleOrchestrator`] sequences
//! the exit stages, and the [`audit`] projector reports closed cycles.
//!
//! ## Collaborators
//!
//! | Trait           | Reference implementation          |
//! |-----------------|-----------------------------------|
//! | [`Persistence`] | [`InMemoryPersistence`]           |
//! | [`Directory`]   | [`StaticDirectory`]               |
//! | [`Notifier`]    | [`TracingNotifier`], [`NullNotifier`], [`RecordingNotifier`] |
//! | [`Clock`]       | [`SystemClock`], [`FixedClock`]   |
//!
//! ## Concurrency
//!
//! There are no background tasks and no internal retries. Two writers that
//! read the same record race on the store's compare-and-swap: one commits,
//! the other gets a [`occ_core::ConflictError`] and decides for itself
//! whether to reload and retry.

pub mod audit;
pub mod clock;
pub mod config;
pub mod directory;
pub mod notify;
pub mod orchestrator;
pub mod persistence;
pub mod store;

pub use audit::AuditEntry;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LifecycleConfig};
pub use directory::{Directory, StaticDirectory};
pub use notify::{Notice, Notifier, NotifyError, NullNotifier, RecordingNotifier, TracingNotifier};
pub use orchestrator::{Advance, LifecycleOrchestrator};
pub use persistence::{ExpectedState, InMemoryPersistence, Persistence, TransitionWrite};
pub use store::{Committed, OccupancyStore, Transition};

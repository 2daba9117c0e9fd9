//! # occ-state: Occupancy Record and Exit-Stage State Machines
//!
//! Models one space's occupancy and the four-stage exit workflow that
//! returns it to the market.
//!
//! ## State Machines
//!
//! - **Occupancy** (`occupancy.rs`): `vacant → occupied → move_out_scheduled
//!   → handover_awaited → recently_vacated → vacant`, plus the move-out
//!   cancellation edge back to `occupied`.
//!
//! - **Handover** (`handover.rs`): `NOT_STARTED → IN_PROGRESS → COMPLETED`.
//!
//! - **Inspection** (`inspection.rs`): `REQUESTED → COMPLETED`. Completion
//!   is the single point where the maintenance decision is made and cached.
//!
//! - **Maintenance** (`maintenance.rs`): `REQUIRED_OPEN → COMPLETED`. Only
//!   exists when the cached decision says so.
//!
//! - **Settlement** (`settlement.rs`): `OPEN → SETTLED`, terminal.
//!
//! ## Design
//!
//! Stage records live inside [`ExitWorkflow`]. Callers reach a stage through
//! [`ExitWorkflow::active_stage`], which hands out a mutable borrow of
//! exactly one stage record, so only the active stage can be mutated.
//! Stage types expose constructors for the orchestrator and mutators for
//! their own controller; no stage can create or delete another.
//!
//! The [`workflow`] module is a pure projection of a record onto the
//! five-step progress view shown to operators.

pub mod handover;
pub mod history;
pub mod inspection;
pub mod maintenance;
pub mod occupancy;
pub mod settlement;
pub mod stage;
pub mod timeline;
pub mod workflow;

pub use handover::{HandoverFields, HandoverInfo, HandoverState, ReturnedItem};
pub use history::ClosedCycle;
pub use inspection::{
    Inspection, InspectionFindings, InspectionPolicy, InspectionReport, InspectionState,
    MaintenanceDecision,
};
pub use maintenance::{Maintenance, MaintenanceOrigin, MaintenanceState};
pub use occupancy::{
    MoveIn, MoveOutRequest, Occupant, OccupantType, OccupancyRecord, OccupancyStatus,
};
pub use settlement::{Settlement, SettlementInput, SettlementState};
pub use stage::{ActiveStage, ExitWorkflow, MaintenanceSlot, StageKind};
pub use timeline::{SequencedEvent, TimelineEvent, TimelineEventKind};
pub use workflow::{evaluate, permitted_actions, Action, Evaluation, Step, StepId};

/// Trim an optional free-text field, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

//! # Workflow Step Evaluator
//!
//! Pure projection of an [`OccupancyRecord`] onto the five exit steps shown
//! to operators, and onto the set of actions a caller may invoke next.
//!
//! Steps are fixed in order. A step is *completed* when its backing record
//! exists and has reached its terminal state, and *enabled* when every step
//! before it is completed. Maintenance is hidden and counted as completed
//! when the inspection decided it is not required.

use serde::{Deserialize, Serialize};

use crate::inspection::MaintenanceDecision;
use crate::occupancy::{OccupancyRecord, OccupancyStatus};
use crate::stage::{ExitWorkflow, MaintenanceSlot, StageKind};

/// Identifier of an exit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    MoveOutRequest,
    Handover,
    Inspection,
    Maintenance,
    Settlement,
}

impl StepId {
    /// Every step, in workflow order.
    pub const ORDER: [StepId; 5] = [
        Self::MoveOutRequest,
        Self::Handover,
        Self::Inspection,
        Self::Maintenance,
        Self::Settlement,
    ];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MoveOutRequest => "Move-Out Request",
            Self::Handover => "Handover",
            Self::Inspection => "Inspection",
            Self::Maintenance => "Maintenance",
            Self::Settlement => "Settlement",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub completed: bool,
    pub enabled: bool,
    pub visible: bool,
}

/// Evaluator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub steps: Vec<Step>,
    /// First incomplete step, or the last step when all are complete.
    pub current_step_index: usize,
}

impl Evaluation {
    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The step the operator is currently on.
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }
}

/// Evaluate the exit steps of `record`.
pub fn evaluate(record: &OccupancyRecord) -> Evaluation {
    let exit = record.exit.as_ref();

    let skip_maintenance = matches!(
        exit.and_then(ExitWorkflow::maintenance_decision),
        Some(MaintenanceDecision::Skip)
    );

    let done = [
        exit.is_some(),
        exit.is_some_and(|e| e.handover.is_completed()),
        exit.is_some_and(|e| e.inspection.as_ref().is_some_and(|i| i.is_completed())),
        skip_maintenance
            || exit.is_some_and(|e| match &e.maintenance {
                MaintenanceSlot::Required(m) => m.is_completed(),
                MaintenanceSlot::Undecided | MaintenanceSlot::Skipped => false,
            }),
        exit.is_some_and(ExitWorkflow::is_settled),
    ];

    let mut steps = Vec::with_capacity(StepId::ORDER.len());
    let mut prior_done = true;
    for (index, id) in StepId::ORDER.into_iter().enumerate() {
        let completed = done[index];
        let enabled = if index == 0 {
            record.status == OccupancyStatus::Occupied || completed
        } else {
            prior_done
        };
        steps.push(Step {
            id,
            completed,
            enabled,
            visible: !(id == StepId::Maintenance && skip_maintenance),
        });
        prior_done = prior_done && completed;
    }

    let current_step_index = steps
        .iter()
        .position(|s| !s.completed)
        .unwrap_or(steps.len() - 1);

    Evaluation {
        steps,
        current_step_index,
    }
}

/// An operation a caller may invoke on the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveIn,
    RequestMoveOut,
    CancelMoveOut,
    SaveHandoverDraft,
    CompleteHandover,
    RequestInspection,
    RescheduleInspection,
    CompleteInspection,
    CompleteMaintenance,
    CompleteSettlement,
    AddNote,
}

/// Actions currently permitted on `record`, in declaration order.
pub fn permitted_actions(record: &OccupancyRecord) -> Vec<Action> {
    let mut actions = match record.status {
        OccupancyStatus::Vacant => vec![Action::MoveIn],
        OccupancyStatus::Occupied => vec![Action::RequestMoveOut],
        _ => match record.exit.as_ref() {
            None => Vec::new(),
            Some(exit) => match exit.stage() {
                StageKind::Handover => vec![
                    Action::CancelMoveOut,
                    Action::SaveHandoverDraft,
                    Action::CompleteHandover,
                ],
                StageKind::InspectionRequest => vec![Action::RequestInspection],
                StageKind::Inspection => {
                    vec![Action::RescheduleInspection, Action::CompleteInspection]
                }
                StageKind::Maintenance => vec![Action::CompleteMaintenance],
                StageKind::Settlement if exit.settlement.is_some() => {
                    vec![Action::CompleteSettlement]
                }
                StageKind::Settlement | StageKind::Closed => Vec::new(),
            },
        },
    };
    actions.push(Action::AddNote);
    actions
}

//! # Exit Workflow
//!
//! Holds the stage records of one exit and hands out the single stage that
//! may currently be mutated.
//!
//! ```text
//! Handover ─▶ InspectionRequest ─▶ Inspection ─┬─▶ Maintenance ─┬─▶ Settlement ─▶ Closed
//!                                              └────(skip)──────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::handover::HandoverInfo;
use crate::inspection::{Inspection, MaintenanceDecision};
use crate::maintenance::Maintenance;
use crate::settlement::Settlement;

/// The maintenance slot of an exit.
///
/// `Undecided` until the inspection completes; then fixed to `Skipped` or
/// `Required` from the inspection's cached decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum MaintenanceSlot {
    #[default]
    Undecided,
    Skipped,
    Required(Maintenance),
}

impl MaintenanceSlot {
    /// Whether settlement may be opened: skipped, or required and done.
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Undecided => false,
            Self::Skipped => true,
            Self::Required(m) => m.is_completed(),
        }
    }

    /// The maintenance record, if one was created.
    pub fn record(&self) -> Option<&Maintenance> {
        match self {
            Self::Required(m) => Some(m),
            _ => None,
        }
    }
}

/// Tag of the stage currently open for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Handover,
    InspectionRequest,
    Inspection,
    Maintenance,
    Settlement,
    Closed,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Handover => "handover",
            Self::InspectionRequest => "inspection request",
            Self::Inspection => "inspection",
            Self::Maintenance => "maintenance",
            Self::Settlement => "settlement",
            Self::Closed => "closed",
        })
    }
}

/// Mutable access to exactly one stage record.
#[derive(Debug)]
pub enum ActiveStage<'a> {
    /// Handover open for drafts and submission.
    Handover(&'a mut HandoverInfo),
    /// Handover done; an inspection may be requested against it.
    InspectionRequest(&'a HandoverInfo),
    /// Inspection requested, awaiting findings.
    Inspection(&'a mut Inspection),
    /// Maintenance open.
    Maintenance(&'a mut Maintenance),
    /// Settlement open.
    Settlement(&'a mut Settlement),
    /// Settlement done; the exit is ready to be archived.
    Closed,
}

impl ActiveStage<'_> {
    /// The tag of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Handover(_) => StageKind::Handover,
            Self::InspectionRequest(_) => StageKind::InspectionRequest,
            Self::Inspection(_) => StageKind::Inspection,
            Self::Maintenance(_) => StageKind::Maintenance,
            Self::Settlement(_) => StageKind::Settlement,
            Self::Closed => StageKind::Closed,
        }
    }
}

/// The stage records of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitWorkflow {
    pub handover: HandoverInfo,
    pub inspection: Option<Inspection>,
    #[serde(default)]
    pub maintenance: MaintenanceSlot,
    pub settlement: Option<Settlement>,
}

impl ExitWorkflow {
    /// A fresh exit whose only record is the handover.
    pub fn new(handover: HandoverInfo) -> Self {
        Self {
            handover,
            inspection: None,
            maintenance: MaintenanceSlot::Undecided,
            settlement: None,
        }
    }

    /// Which stage is currently open.
    pub fn stage(&self) -> StageKind {
        if !self.handover.is_completed() {
            return StageKind::Handover;
        }
        match &self.inspection {
            None => return StageKind::InspectionRequest,
            Some(i) if !i.is_completed() => return StageKind::Inspection,
            Some(_) => {}
        }
        if let MaintenanceSlot::Required(m) = &self.maintenance {
            if !m.is_completed() {
                return StageKind::Maintenance;
            }
        }
        match &self.settlement {
            Some(s) if s.is_settled() => StageKind::Closed,
            _ => StageKind::Settlement,
        }
    }

    /// Borrow the open stage mutably.
    ///
    /// `None` only at the settlement stage before a settlement record has
    /// been opened.
    pub fn active_stage(&mut self) -> Option<ActiveStage<'_>> {
        let stage = self.stage();
        match stage {
            StageKind::Handover => Some(ActiveStage::Handover(&mut self.handover)),
            StageKind::InspectionRequest => Some(ActiveStage::InspectionRequest(&self.handover)),
            StageKind::Inspection => self.inspection.as_mut().map(ActiveStage::Inspection),
            StageKind::Maintenance => match &mut self.maintenance {
                MaintenanceSlot::Required(m) => Some(ActiveStage::Maintenance(m)),
                _ => None,
            },
            StageKind::Settlement => self.settlement.as_mut().map(ActiveStage::Settlement),
            StageKind::Closed => Some(ActiveStage::Closed),
        }
    }

    /// The cached maintenance decision, once the inspection has completed.
    pub fn maintenance_decision(&self) -> Option<MaintenanceDecision> {
        self.inspection.as_ref().and_then(|i| i.decision)
    }

    /// Whether the settlement has been completed.
    pub fn is_settled(&self) -> bool {
        self.settlement.as_ref().is_some_and(Settlement::is_settled)
    }
}

//! # Occupancy Record
//!
//! The current occupancy of one space and the status machine that governs
//! it.
//!
//! ## States
//!
//! ```text
//! vacant ──move_in──▶ occupied ──request_move_out──▶ move_out_scheduled
//!    ▲                   ▲                                │
//!    │                   └────────cancel_move_out─────────┤
//!    │                                                    │ handover completed
//!    │                                                    ▼
//!    │                                            handover_awaited
//!    │                                                    │ inspection (no damage)
//!    │                                                    │ or maintenance completed
//!    │   settlement completed                             ▼
//!    └──────────────────────────────────────────── recently_vacated
//! ```
//!
//! A space has exactly one current record. `vacant` is the resting state
//! between cycles; every other state belongs to the cycle in progress.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use occ_core::{LifecycleError, SpaceId, StateError, Timestamp, ValidationError};

use crate::handover::HandoverInfo;
use crate::history::ClosedCycle;
use crate::non_blank;
use crate::stage::{ExitWorkflow, MaintenanceSlot, StageKind};

/// Occupancy status of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    /// Available; no occupant.
    Vacant,
    /// Occupied by an owner or tenant.
    Occupied,
    /// Move-out requested; handover open.
    MoveOutScheduled,
    /// Handover done; inspection (and possibly maintenance) in progress.
    HandoverAwaited,
    /// Physically vacated; settlement open.
    RecentlyVacated,
}

impl OccupancyStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OccupancyStatus; 5] = [
        Self::Vacant,
        Self::Occupied,
        Self::MoveOutScheduled,
        Self::HandoverAwaited,
        Self::RecentlyVacated,
    ];

    /// The canonical name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacant => "vacant",
            Self::Occupied => "occupied",
            Self::MoveOutScheduled => "move_out_scheduled",
            Self::HandoverAwaited => "handover_awaited",
            Self::RecentlyVacated => "recently_vacated",
        }
    }

    /// Parse a canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether no cycle is in progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Vacant)
    }

    /// Whether an exit workflow must exist in this status.
    pub fn holds_exit(&self) -> bool {
        matches!(
            self,
            Self::MoveOutScheduled | Self::HandoverAwaited | Self::RecentlyVacated
        )
    }

    /// The set of statuses reachable in one transition.
    pub fn valid_transitions(&self) -> &'static [OccupancyStatus] {
        match self {
            Self::Vacant => &[Self::Occupied],
            Self::Occupied => &[Self::MoveOutScheduled],
            Self::MoveOutScheduled => &[Self::Occupied, Self::HandoverAwaited],
            Self::HandoverAwaited => &[Self::RecentlyVacated],
            Self::RecentlyVacated => &[Self::Vacant],
        }
    }

    /// Whether `next` is reachable in one transition.
    pub fn can_transition_to(&self, next: OccupancyStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl std::fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantType {
    Owner,
    Tenant,
}

impl std::fmt::Display for OccupantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Tenant => "tenant",
        })
    }
}

/// The current or most recent occupant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub occupant_type: OccupantType,
    pub name: String,
}

/// Move-in form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIn {
    pub occupant_type: OccupantType,
    pub occupant_name: String,
    pub move_in_date: NaiveDate,
    #[serde(default)]
    pub reference_no: Option<String>,
}

/// Move-out request form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutRequest {
    #[serde(default)]
    pub move_out_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The current occupancy of one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub space_id: SpaceId,
    pub status: OccupancyStatus,
    /// Write counter; 0 means never persisted.
    pub revision: u64,
    /// Cycle number, incremented by every move-in.
    pub cycle: u32,
    pub occupant: Option<Occupant>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub reference_no: Option<String>,
    pub exit: Option<ExitWorkflow>,
    pub updated_at: Option<Timestamp>,
}

impl OccupancyRecord {
    /// A never-occupied vacant record.
    pub fn vacant(space_id: SpaceId) -> Self {
        Self {
            space_id,
            status: OccupancyStatus::Vacant,
            revision: 0,
            cycle: 0,
            occupant: None,
            move_in_date: None,
            move_out_date: None,
            reference_no: None,
            exit: None,
            updated_at: None,
        }
    }

    /// The open exit stage, if an exit is in progress.
    pub fn stage(&self) -> Option<StageKind> {
        self.exit.as_ref().map(ExitWorkflow::stage)
    }

    /// Record a new occupant on a vacant space.
    ///
    /// # Errors
    ///
    /// - [`StateError`] unless the space is vacant.
    /// - [`ValidationError`] if the occupant name is blank.
    pub fn move_in(&mut self, req: MoveIn) -> Result<(), LifecycleError> {
        self.require_status(OccupancyStatus::Vacant, "move in")?;
        let name = non_blank(Some(req.occupant_name))
            .ok_or_else(|| ValidationError::missing("occupant_name"))?;

        self.cycle = self.cycle.saturating_add(1);
        self.occupant = Some(Occupant {
            occupant_type: req.occupant_type,
            name,
        });
        self.move_in_date = Some(req.move_in_date);
        self.move_out_date = None;
        self.reference_no = non_blank(req.reference_no);
        self.exit = None;
        Ok(())
    }

    /// Begin the exit workflow with a freshly created handover.
    ///
    /// # Errors
    ///
    /// - [`StateError`] unless the space is occupied.
    /// - [`ValidationError::DateOrder`] if the move-out date precedes the
    ///   move-in date.
    pub fn schedule_move_out(
        &mut self,
        req: &MoveOutRequest,
        handover: HandoverInfo,
    ) -> Result<(), LifecycleError> {
        self.require_status(OccupancyStatus::Occupied, "request move-out")?;
        if let (Some(move_in), Some(move_out)) = (self.move_in_date, req.move_out_date) {
            if move_out < move_in {
                return Err(ValidationError::DateOrder {
                    earlier_field: "move_in_date",
                    earlier: move_in,
                    later_field: "move_out_date",
                    later: move_out,
                }
                .into());
            }
        }
        self.move_out_date = req.move_out_date;
        self.exit = Some(ExitWorkflow::new(handover));
        Ok(())
    }

    /// Withdraw a move-out request before the handover is submitted.
    ///
    /// The handover record is discarded.
    pub fn cancel_move_out(&mut self) -> Result<(), LifecycleError> {
        self.require_status(OccupancyStatus::MoveOutScheduled, "cancel move-out")?;
        if self
            .exit
            .as_ref()
            .is_some_and(|exit| exit.handover.is_completed())
        {
            return Err(StateError::new(
                "cancel move-out",
                self.status,
                "handover was already completed",
            )
            .into());
        }
        self.exit = None;
        self.move_out_date = None;
        Ok(())
    }

    /// Archive a settled exit and return the record to its resting shape.
    ///
    /// The returned snapshot carries every stage record of the cycle.
    pub fn close_cycle(&mut self, closed_at: Timestamp) -> Result<ClosedCycle, LifecycleError> {
        self.require_status(OccupancyStatus::RecentlyVacated, "close cycle")?;
        let settled = self.exit.as_ref().is_some_and(ExitWorkflow::is_settled);
        if !settled {
            return Err(StateError::new(
                "close cycle",
                self.status,
                "settlement has not been completed",
            )
            .into());
        }
        let occupant = self.occupant.clone().ok_or_else(|| {
            StateError::new("close cycle", self.status, "record has no occupant")
        })?;
        let exit = self.exit.take().ok_or_else(|| {
            StateError::new("close cycle", self.status, "no exit in progress")
        })?;
        let ExitWorkflow {
            handover,
            inspection,
            maintenance,
            settlement,
        } = exit;
        let (Some(inspection), Some(settlement)) = (inspection, settlement) else {
            return Err(StateError::new(
                "close cycle",
                self.status,
                "exit is missing its inspection or settlement",
            )
            .into());
        };
        let maintenance = match maintenance {
            MaintenanceSlot::Required(m) => Some(m),
            MaintenanceSlot::Skipped | MaintenanceSlot::Undecided => None,
        };

        let closed = ClosedCycle {
            space_id: self.space_id.clone(),
            cycle: self.cycle,
            occupant,
            move_in_date: self.move_in_date,
            move_out_date: self.move_out_date,
            reference_no: self.reference_no.clone(),
            handover,
            inspection,
            maintenance,
            settlement,
            closed_at,
        };

        self.occupant = None;
        self.move_in_date = None;
        self.move_out_date = None;
        self.reference_no = None;
        Ok(closed)
    }

    /// Check the structural invariants that must hold in `self.status`.
    pub fn check_invariants(&self) -> Result<(), StateError> {
        let fail = |reason: &str| Err(StateError::new("persist record", self.status, reason));

        if self.status.is_terminal() != self.occupant.is_none() {
            return fail("occupant must be present exactly when the space is not vacant");
        }
        if self.status.holds_exit() != self.exit.is_some() {
            return fail("exit workflow must be present exactly during move-out");
        }
        if let (Some(move_in), Some(move_out)) = (self.move_in_date, self.move_out_date) {
            if move_out < move_in {
                return fail("move_out_date precedes move_in_date");
            }
        }
        if let Some(exit) = &self.exit {
            let stage = exit.stage();
            let consistent = match self.status {
                OccupancyStatus::MoveOutScheduled => stage == StageKind::Handover,
                OccupancyStatus::HandoverAwaited => matches!(
                    stage,
                    StageKind::InspectionRequest | StageKind::Inspection | StageKind::Maintenance
                ),
                OccupancyStatus::RecentlyVacated => {
                    exit.maintenance.is_resolved() && exit.settlement.is_some()
                }
                OccupancyStatus::Vacant | OccupancyStatus::Occupied => false,
            };
            if !consistent {
                return fail(&format!("exit stage {stage} does not belong to this status"));
            }
        }
        Ok(())
    }

    fn require_status(&self, expected: OccupancyStatus, operation: &str) -> Result<(), StateError> {
        if self.status != expected {
            return Err(StateError::new(
                operation,
                self.status,
                format!("space must be {expected}"),
            ));
        }
        Ok(())
    }
}

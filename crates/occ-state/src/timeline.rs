//! # Timeline Events
//!
//! Append-only log entries. One event is produced by every committed
//! transition; operator notes add events without a status change. Events
//! are never mutated or deleted once sequenced.

use serde::{Deserialize, Serialize};

use occ_core::{SpaceId, Timestamp};

use crate::occupancy::{OccupancyRecord, OccupancyStatus, OccupantType};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    MovedIn,
    MoveOutRequested,
    MoveOutCancelled,
    HandoverDraftSaved,
    HandoverCompleted,
    InspectionRequested,
    InspectionRescheduled,
    InspectionCompleted,
    MaintenanceCompleted,
    SettlementCompleted,
    Note,
}

impl TimelineEventKind {
    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MovedIn => "Moved in",
            Self::MoveOutRequested => "Move-out requested",
            Self::MoveOutCancelled => "Move-out cancelled",
            Self::HandoverDraftSaved => "Handover draft saved",
            Self::HandoverCompleted => "Handover completed",
            Self::InspectionRequested => "Inspection scheduled",
            Self::InspectionRescheduled => "Inspection rescheduled",
            Self::InspectionCompleted => "Inspection completed",
            Self::MaintenanceCompleted => "Maintenance completed",
            Self::SettlementCompleted => "Settlement completed",
            Self::Note => "Note",
        }
    }
}

impl std::fmt::Display for TimelineEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A timeline entry before the log assigns it a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub space_id: SpaceId,
    /// Occupancy cycle the event belongs to.
    pub cycle: u32,
    #[serde(rename = "event")]
    pub kind: TimelineEventKind,
    pub from_status: OccupancyStatus,
    pub to_status: OccupancyStatus,
    pub occupant_type: Option<OccupantType>,
    pub occupant_name: Option<String>,
    pub date: Timestamp,
    pub notes: Option<String>,
}

impl TimelineEvent {
    /// Describe the move from `before` to `after`.
    ///
    /// Occupant identity is taken from `before` when present so the closing
    /// event of a cycle still names the departing occupant.
    pub fn for_transition(
        before: &OccupancyRecord,
        after: &OccupancyRecord,
        kind: TimelineEventKind,
        date: Timestamp,
        notes: Option<String>,
    ) -> Self {
        let occupant = before.occupant.as_ref().or(after.occupant.as_ref());
        Self {
            space_id: after.space_id.clone(),
            cycle: after.cycle.max(before.cycle),
            kind,
            from_status: before.status,
            to_status: after.status,
            occupant_type: occupant.map(|o| o.occupant_type),
            occupant_name: occupant.map(|o| o.name.clone()),
            date,
            notes: crate::non_blank(notes),
        }
    }

    /// An operator note against the current record.
    pub fn note(record: &OccupancyRecord, date: Timestamp, notes: String) -> Self {
        Self::for_transition(record, record, TimelineEventKind::Note, date, Some(notes))
    }
}

/// A timeline event with its position in the space's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Monotonic per space, starting at 1.
    pub seq: u64,
    #[serde(flatten)]
    pub event: TimelineEvent,
}

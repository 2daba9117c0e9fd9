//! Archived occupancy cycles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use occ_core::{SpaceId, Timestamp};

use crate::handover::HandoverInfo;
use crate::inspection::Inspection;
use crate::maintenance::Maintenance;
use crate::occupancy::Occupant;
use crate::settlement::Settlement;

/// Snapshot of one completed occupancy cycle, written atomically with the
/// settlement transition that closes it. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedCycle {
    pub space_id: SpaceId,
    pub cycle: u32,
    pub occupant: Occupant,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub reference_no: Option<String>,
    pub handover: HandoverInfo,
    pub inspection: Inspection,
    /// Present only when the inspection required maintenance.
    pub maintenance: Option<Maintenance>,
    pub settlement: Settlement,
    pub closed_at: Timestamp,
}

impl ClosedCycle {
    /// Whether this cycle went through maintenance.
    pub fn had_maintenance(&self) -> bool {
        self.maintenance.is_some()
    }
}

//! # Maintenance Stage
//!
//! Repair work between inspection and settlement. A maintenance record
//! exists only when the inspection's cached decision requires it.
//!
//! ```text
//! create() ──▶ REQUIRED_OPEN ──complete()──▶ COMPLETED
//! ```

use serde::{Deserialize, Serialize};

use occ_core::{InspectionId, LifecycleError, MaintenanceId, StateError, Timestamp};

use crate::inspection::{Inspection, MaintenanceDecision};
use crate::non_blank;

/// Lifecycle state of a maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceState {
    /// Opened, work outstanding.
    RequiredOpen,
    /// Work finished.
    Completed,
}

impl std::fmt::Display for MaintenanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RequiredOpen => "REQUIRED_OPEN",
            Self::Completed => "COMPLETED",
        })
    }
}

/// Why a maintenance job was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceOrigin {
    /// The inspection reported damage.
    DamageReported,
    /// An operator forced maintenance without reported damage.
    OperatorOverride,
}

/// The maintenance record of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    pub id: MaintenanceId,
    pub inspection_id: InspectionId,
    pub state: MaintenanceState,
    pub maintenance_required: bool,
    pub notes: Option<String>,
    pub origin: MaintenanceOrigin,
    pub completed_at: Option<Timestamp>,
}

impl Maintenance {
    /// Open a maintenance job for a completed inspection whose cached
    /// decision requires one.
    ///
    /// # Errors
    ///
    /// [`StateError`] if the inspection is still requested or its decision
    /// was to skip maintenance.
    pub fn create(
        id: MaintenanceId,
        inspection: &Inspection,
        required: bool,
        notes: Option<String>,
    ) -> Result<Self, LifecycleError> {
        match inspection.decision {
            Some(MaintenanceDecision::Required { origin }) => Ok(Self {
                id,
                inspection_id: inspection.id,
                state: MaintenanceState::RequiredOpen,
                maintenance_required: required,
                notes: non_blank(notes),
                origin,
                completed_at: None,
            }),
            Some(MaintenanceDecision::Skip) => Err(StateError::new(
                "create maintenance",
                inspection.state,
                "inspection decided maintenance is not required",
            )
            .into()),
            None => Err(StateError::new(
                "create maintenance",
                inspection.state,
                "inspection has not been completed",
            )
            .into()),
        }
    }

    /// Whether the work is finished.
    pub fn is_completed(&self) -> bool {
        self.state == MaintenanceState::Completed
    }

    /// Close the job. `completed_at` defaults to `now`.
    ///
    /// # Errors
    ///
    /// [`StateError`] if `id` is not this job or it is already completed.
    pub fn complete(
        &mut self,
        id: MaintenanceId,
        completed_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        if id != self.id {
            return Err(StateError::new(
                "complete maintenance",
                self.state,
                format!("{id} is not the active maintenance job ({})", self.id),
            )
            .into());
        }
        if self.is_completed() {
            return Err(StateError::new(
                "complete maintenance",
                self.state,
                "maintenance was already completed",
            )
            .into());
        }
        self.state = MaintenanceState::Completed;
        self.completed_at = Some(completed_at.unwrap_or(now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handover::{HandoverFields, HandoverInfo};
    use crate::inspection::{InspectionPolicy, InspectionReport};
    use chrono::NaiveDate;
    use occ_core::{HandoverId, UserId};

    fn inspection(report: InspectionReport) -> Inspection {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut h = HandoverInfo::new(HandoverId::new());
        let fields = HandoverFields {
            handover_date: Some(day),
            handover_to_person: Some("Raj".into()),
            ..HandoverFields::default()
        };
        h.complete(h.id, fields, Timestamp::now()).unwrap();
        let mut i =
            Inspection::request(InspectionId::new(), &h, day, UserId::new("u-1").unwrap(), day)
                .unwrap();
        i.complete(i.id, report, InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        i
    }

    fn damaged() -> Inspection {
        inspection(InspectionReport {
            damage_found: true,
            damage_notes: Some("hole in wall".into()),
            ..InspectionReport::default()
        })
    }

    #[test]
    fn create_from_damage() {
        let i = damaged();
        let m = Maintenance::create(MaintenanceId::new(), &i, true, Some("patch wall".into()))
            .unwrap();
        assert_eq!(m.state, MaintenanceState::RequiredOpen);
        assert_eq!(m.origin, MaintenanceOrigin::DamageReported);
        assert_eq!(m.inspection_id, i.id);
        assert!(!m.is_completed());
    }

    #[test]
    fn create_refused_when_skipped() {
        let i = inspection(InspectionReport::default());
        let err = Maintenance::create(MaintenanceId::new(), &i, true, None).unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }

    #[test]
    fn complete_defaults_to_now() {
        let mut m = Maintenance::create(MaintenanceId::new(), &damaged(), true, None).unwrap();
        let now = Timestamp::parse("2024-06-05T10:00:00Z").unwrap();
        m.complete(m.id, None, now).unwrap();
        assert!(m.is_completed());
        assert_eq!(m.completed_at, Some(now));
    }

    #[test]
    fn complete_uses_given_time() {
        let mut m = Maintenance::create(MaintenanceId::new(), &damaged(), true, None).unwrap();
        let at = Timestamp::parse("2024-06-04T16:30:00Z").unwrap();
        m.complete(m.id, Some(at), Timestamp::now()).unwrap();
        assert_eq!(m.completed_at, Some(at));
    }

    #[test]
    fn complete_twice_rejected() {
        let mut m = Maintenance::create(MaintenanceId::new(), &damaged(), true, None).unwrap();
        m.complete(m.id, None, Timestamp::now()).unwrap();
        let err = m.complete(m.id, None, Timestamp::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }
}

//! # Inspection Stage
//!
//! Two-phase inspection of the vacated space.
//!
//! ```text
//! request() ──▶ REQUESTED ──complete()──▶ COMPLETED
//!                  │  ▲
//!                  └──┘ reschedule()
//! ```
//!
//! Completion records the per-area conditions and the damage verdict, and
//! computes the [`MaintenanceDecision`] exactly once. The decision is cached
//! on the record; the evaluator and the orchestrator both read the cached
//! value and never re-derive it from the findings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use occ_core::{
    HandoverId, InspectionId, LifecycleError, StateError, Timestamp, UserId, ValidationError,
};

use crate::handover::HandoverInfo;
use crate::maintenance::MaintenanceOrigin;
use crate::non_blank;

/// Lifecycle state of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionState {
    /// Scheduled, not yet carried out.
    Requested,
    /// Findings recorded.
    Completed,
}

impl std::fmt::Display for InspectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Requested => "REQUESTED",
            Self::Completed => "COMPLETED",
        })
    }
}

/// Whether the exit proceeds through maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MaintenanceDecision {
    /// No maintenance; the exit goes straight to settlement.
    Skip,
    /// A maintenance record is opened.
    Required {
        /// Why maintenance was required.
        origin: MaintenanceOrigin,
    },
}

impl MaintenanceDecision {
    /// Whether maintenance is required.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required { .. })
    }
}

/// Operator-configurable rules applied at inspection completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionPolicy {
    /// Whether an operator may force maintenance without reported damage.
    pub allow_maintenance_override: bool,
    /// Whether reported damage must come with notes.
    pub require_damage_notes: bool,
}

impl Default for InspectionPolicy {
    fn default() -> Self {
        Self {
            allow_maintenance_override: true,
            require_damage_notes: false,
        }
    }
}

/// Recorded outcome of a completed inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionFindings {
    pub walls_condition: Option<String>,
    pub flooring_condition: Option<String>,
    pub electrical_condition: Option<String>,
    pub plumbing_condition: Option<String>,
    pub damage_found: bool,
    pub damage_notes: Option<String>,
}

/// Form input for completing an inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    #[serde(default)]
    pub walls_condition: Option<String>,
    #[serde(default)]
    pub flooring_condition: Option<String>,
    #[serde(default)]
    pub electrical_condition: Option<String>,
    #[serde(default)]
    pub plumbing_condition: Option<String>,
    #[serde(default)]
    pub damage_found: bool,
    #[serde(default)]
    pub damage_notes: Option<String>,
    /// Operator override: open maintenance even without reported damage.
    #[serde(default)]
    pub force_maintenance: bool,
}

/// The inspection record of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: InspectionId,
    pub handover_id: HandoverId,
    pub state: InspectionState,
    pub scheduled_date: NaiveDate,
    pub inspected_by: UserId,
    pub findings: Option<InspectionFindings>,
    /// Cached at completion; `None` while requested.
    pub decision: Option<MaintenanceDecision>,
    pub completed_at: Option<Timestamp>,
}

impl Inspection {
    /// Create an inspection in `REQUESTED`.
    ///
    /// # Errors
    ///
    /// - [`StateError`] if the handover has not been completed.
    /// - [`ValidationError::DateInPast`] if `scheduled_date` is before
    ///   `today`.
    pub fn request(
        id: InspectionId,
        handover: &HandoverInfo,
        scheduled_date: NaiveDate,
        inspected_by: UserId,
        today: NaiveDate,
    ) -> Result<Self, LifecycleError> {
        if !handover.is_completed() {
            return Err(StateError::new(
                "request inspection",
                handover.state,
                "handover must be completed first",
            )
            .into());
        }
        check_schedule(scheduled_date, today)?;
        Ok(Self {
            id,
            handover_id: handover.id,
            state: InspectionState::Requested,
            scheduled_date,
            inspected_by,
            findings: None,
            decision: None,
            completed_at: None,
        })
    }

    /// Whether findings have been recorded.
    pub fn is_completed(&self) -> bool {
        self.state == InspectionState::Completed
    }

    /// Whether damage was reported. `false` while requested.
    pub fn damage_found(&self) -> bool {
        self.findings.as_ref().is_some_and(|f| f.damage_found)
    }

    /// Move a requested inspection to a new date and/or inspector.
    pub fn reschedule(
        &mut self,
        id: InspectionId,
        scheduled_date: NaiveDate,
        inspected_by: UserId,
        today: NaiveDate,
    ) -> Result<(), LifecycleError> {
        self.require_requested(id, "reschedule inspection")?;
        check_schedule(scheduled_date, today)?;
        self.scheduled_date = scheduled_date;
        self.inspected_by = inspected_by;
        Ok(())
    }

    /// Record findings and decide whether maintenance is required.
    ///
    /// # Errors
    ///
    /// - [`StateError`] if `id` is not this inspection, it is already
    ///   completed, or `force_maintenance` is set while the policy forbids
    ///   overrides.
    /// - [`ValidationError`] if damage is reported without notes while the
    ///   policy requires them.
    pub fn complete(
        &mut self,
        id: InspectionId,
        report: InspectionReport,
        policy: InspectionPolicy,
        now: Timestamp,
    ) -> Result<MaintenanceDecision, LifecycleError> {
        self.require_requested(id, "complete inspection")?;

        let damage_notes = non_blank(report.damage_notes);
        if report.damage_found && policy.require_damage_notes && damage_notes.is_none() {
            return Err(ValidationError::missing("damage_notes").into());
        }
        if report.force_maintenance && !policy.allow_maintenance_override {
            return Err(StateError::new(
                "force maintenance",
                self.state,
                "maintenance override is disabled",
            )
            .into());
        }

        let decision = if report.damage_found {
            MaintenanceDecision::Required {
                origin: MaintenanceOrigin::DamageReported,
            }
        } else if report.force_maintenance {
            MaintenanceDecision::Required {
                origin: MaintenanceOrigin::OperatorOverride,
            }
        } else {
            MaintenanceDecision::Skip
        };

        self.findings = Some(InspectionFindings {
            walls_condition: non_blank(report.walls_condition),
            flooring_condition: non_blank(report.flooring_condition),
            electrical_condition: non_blank(report.electrical_condition),
            plumbing_condition: non_blank(report.plumbing_condition),
            damage_found: report.damage_found,
            damage_notes,
        });
        self.decision = Some(decision);
        self.state = InspectionState::Completed;
        self.completed_at = Some(now);
        Ok(decision)
    }

    fn require_requested(&self, id: InspectionId, operation: &str) -> Result<(), StateError> {
        if id != self.id {
            return Err(StateError::new(
                operation,
                self.state,
                format!("{id} is not the active inspection ({})", self.id),
            ));
        }
        if self.is_completed() {
            return Err(StateError::new(
                operation,
                self.state,
                "inspection findings were already recorded",
            ));
        }
        Ok(())
    }
}

fn check_schedule(scheduled_date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if scheduled_date < today {
        return Err(ValidationError::DateInPast {
            field: "scheduled_date",
            date: scheduled_date,
            today,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handover::HandoverFields;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completed_handover() -> HandoverInfo {
        let mut h = HandoverInfo::new(HandoverId::new());
        let fields = HandoverFields {
            handover_date: Some(date(2024, 6, 1)),
            handover_to_person: Some("Raj".into()),
            ..HandoverFields::default()
        };
        h.complete(h.id, fields, Timestamp::now()).unwrap();
        h
    }

    fn requested() -> Inspection {
        Inspection::request(
            InspectionId::new(),
            &completed_handover(),
            date(2024, 6, 3),
            UserId::new("u-17").unwrap(),
            date(2024, 6, 1),
        )
        .unwrap()
    }

    #[test]
    fn request_requires_completed_handover() {
        let h = HandoverInfo::new(HandoverId::new());
        let err = Inspection::request(
            InspectionId::new(),
            &h,
            date(2024, 6, 3),
            UserId::new("u-17").unwrap(),
            date(2024, 6, 1),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }

    #[test]
    fn request_accepts_today_rejects_past() {
        let h = completed_handover();
        let today = date(2024, 6, 1);
        let inspector = UserId::new("u-17").unwrap();
        assert!(Inspection::request(InspectionId::new(), &h, today, inspector.clone(), today).is_ok());
        let err = Inspection::request(InspectionId::new(), &h, date(2024, 5, 31), inspector, today)
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Validation(ValidationError::DateInPast { .. })
        ));
    }

    #[test]
    fn no_damage_skips_maintenance() {
        let mut i = requested();
        let decision = i
            .complete(i.id, InspectionReport::default(), InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        assert_eq!(decision, MaintenanceDecision::Skip);
        assert_eq!(i.decision, Some(MaintenanceDecision::Skip));
        assert!(i.is_completed());
        assert!(!i.damage_found());
    }

    #[test]
    fn damage_requires_maintenance() {
        let mut i = requested();
        let report = InspectionReport {
            damage_found: true,
            damage_notes: Some("cracked tiles".into()),
            flooring_condition: Some("poor".into()),
            ..InspectionReport::default()
        };
        let decision = i
            .complete(i.id, report, InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        assert_eq!(
            decision,
            MaintenanceDecision::Required {
                origin: MaintenanceOrigin::DamageReported
            }
        );
        assert!(i.damage_found());
    }

    #[test]
    fn override_forces_maintenance_when_allowed() {
        let mut i = requested();
        let report = InspectionReport {
            force_maintenance: true,
            ..InspectionReport::default()
        };
        let decision = i
            .complete(i.id, report.clone(), InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        assert!(decision.is_required());

        let mut i = requested();
        let policy = InspectionPolicy {
            allow_maintenance_override: false,
            ..InspectionPolicy::default()
        };
        let err = i.complete(i.id, report, policy, Timestamp::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
        assert_eq!(i.state, InspectionState::Requested);
    }

    #[test]
    fn damage_notes_policy() {
        let mut i = requested();
        let policy = InspectionPolicy {
            require_damage_notes: true,
            ..InspectionPolicy::default()
        };
        let report = InspectionReport {
            damage_found: true,
            damage_notes: Some(" ".into()),
            ..InspectionReport::default()
        };
        let err = i.complete(i.id, report, policy, Timestamp::now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Validation(ValidationError::missing("damage_notes"))
        );
    }

    #[test]
    fn reschedule_only_while_requested() {
        let mut i = requested();
        let today = date(2024, 6, 1);
        i.reschedule(i.id, date(2024, 6, 10), UserId::new("u-20").unwrap(), today)
            .unwrap();
        assert_eq!(i.scheduled_date, date(2024, 6, 10));
        assert_eq!(i.inspected_by.as_str(), "u-20");

        i.complete(i.id, InspectionReport::default(), InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        let err = i
            .reschedule(i.id, date(2024, 6, 11), UserId::new("u-20").unwrap(), today)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }

    #[test]
    fn second_completion_rejected() {
        let mut i = requested();
        i.complete(i.id, InspectionReport::default(), InspectionPolicy::default(), Timestamp::now())
            .unwrap();
        let err = i
            .complete(i.id, InspectionReport::default(), InspectionPolicy::default(), Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }
}

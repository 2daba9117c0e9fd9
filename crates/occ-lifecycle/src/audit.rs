//! # History/Audit Projector
//!
//! Joins archived cycles with the event log into one report entry per
//! cycle. Snapshots are authoritative for stage data; the log supplies the
//! chronology. Pure: the same inputs always give the same report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use occ_core::{Amount, Timestamp};
use occ_state::{ClosedCycle, MaintenanceOrigin, OccupantType, SequencedEvent, TimelineEventKind};

use crate::directory::Directory;

/// One closed cycle as presented to auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub cycle: u32,
    pub occupant_type: OccupantType,
    pub occupant_name: String,
    pub reference_no: Option<String>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub handover_date: Option<NaiveDate>,
    pub handed_over_to: Option<String>,
    pub inspection_date: NaiveDate,
    /// Display name of the inspector.
    pub inspected_by: String,
    pub damage_found: bool,
    pub damage_notes: Option<String>,
    /// Why maintenance ran; `None` when it was skipped.
    pub maintenance: Option<MaintenanceOrigin>,
    pub damage_charges: Amount,
    pub pending_dues: Amount,
    pub final_amount: Amount,
    pub closed_at: Timestamp,
    /// Events of this cycle, ascending by sequence number.
    pub events: Vec<SequencedEvent>,
}

/// Project `history` and `timeline` into audit entries, most recent cycle
/// first.
pub fn project(
    history: &[ClosedCycle],
    timeline: &[SequencedEvent],
    directory: &dyn Directory,
) -> Vec<AuditEntry> {
    let mut by_cycle: BTreeMap<u32, Vec<SequencedEvent>> = BTreeMap::new();
    for event in timeline {
        by_cycle
            .entry(event.event.cycle)
            .or_default()
            .push(event.clone());
    }
    for events in by_cycle.values_mut() {
        events.sort_by_key(|e| e.seq);
        // Notes made while vacant carry the closed cycle's number; an
        // archived entry ends at its settlement.
        if let Some(close) = events
            .iter()
            .position(|e| e.event.kind == TimelineEventKind::SettlementCompleted)
        {
            events.truncate(close + 1);
        }
    }

    let mut entries: Vec<AuditEntry> = history
        .iter()
        .map(|closed| {
            let findings = closed.inspection.findings.as_ref();
            AuditEntry {
                cycle: closed.cycle,
                occupant_type: closed.occupant.occupant_type,
                occupant_name: closed.occupant.name.clone(),
                reference_no: closed.reference_no.clone(),
                move_in_date: closed.move_in_date,
                move_out_date: closed.move_out_date,
                handover_date: closed.handover.handover_date,
                handed_over_to: closed.handover.handover_to_person.clone(),
                inspection_date: closed.inspection.scheduled_date,
                inspected_by: directory.display_name_or_id(&closed.inspection.inspected_by),
                damage_found: closed.inspection.damage_found(),
                damage_notes: findings.and_then(|f| f.damage_notes.clone()),
                maintenance: closed.maintenance.as_ref().map(|m| m.origin),
                damage_charges: closed.settlement.damage_charges,
                pending_dues: closed.settlement.pending_dues,
                final_amount: closed.settlement.final_amount,
                closed_at: closed.closed_at,
                events: by_cycle.get(&closed.cycle).cloned().unwrap_or_default(),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.cycle.cmp(&a.cycle));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use occ_core::{HandoverId, InspectionId, SettlementId, SpaceId, UserId};
    use occ_state::{
        HandoverFields, HandoverInfo, Inspection, InspectionPolicy, InspectionReport, Occupant,
        OccupancyStatus, Settlement, SettlementInput, TimelineEvent,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn closed(cycle: u32, name: &str) -> ClosedCycle {
        let now = Timestamp::parse("2024-06-10T12:00:00Z").unwrap();
        let mut handover = HandoverInfo::new(HandoverId::new());
        handover
            .complete(
                handover.id,
                HandoverFields {
                    handover_date: Some(day()),
                    handover_to_person: Some("Desk".into()),
                    ..HandoverFields::default()
                },
                now,
            )
            .unwrap();
        let mut inspection = Inspection::request(
            InspectionId::new(),
            &handover,
            day(),
            UserId::new("insp-1").unwrap(),
            day(),
        )
        .unwrap();
        inspection
            .complete(
                inspection.id,
                InspectionReport::default(),
                InspectionPolicy::default(),
                now,
            )
            .unwrap();
        let mut settlement = Settlement::open(SettlementId::new());
        settlement
            .complete(settlement.id, &SettlementInput::new(10u32, 5u32), now)
            .unwrap();
        ClosedCycle {
            space_id: SpaceId::new("E-1").unwrap(),
            cycle,
            occupant: Occupant {
                occupant_type: OccupantType::Tenant,
                name: name.into(),
            },
            move_in_date: None,
            move_out_date: None,
            reference_no: None,
            handover,
            inspection,
            maintenance: None,
            settlement,
            closed_at: now,
        }
    }

    fn event(seq: u64, cycle: u32, kind: TimelineEventKind) -> SequencedEvent {
        SequencedEvent {
            seq,
            event: TimelineEvent {
                space_id: SpaceId::new("E-1").unwrap(),
                cycle,
                kind,
                from_status: OccupancyStatus::Occupied,
                to_status: OccupancyStatus::Occupied,
                occupant_type: None,
                occupant_name: None,
                date: Timestamp::parse("2024-06-10T12:00:00Z").unwrap(),
                notes: None,
            },
        }
    }

    #[test]
    fn most_recent_cycle_first_events_ascending() {
        let history = vec![closed(1, "First"), closed(2, "Second")];
        let timeline = vec![
            event(3, 2, TimelineEventKind::MovedIn),
            event(1, 1, TimelineEventKind::MovedIn),
            event(4, 2, TimelineEventKind::SettlementCompleted),
            event(2, 1, TimelineEventKind::SettlementCompleted),
        ];
        let dir = StaticDirectory::new().with_user(UserId::new("insp-1").unwrap(), "Priya");
        let report = project(&history, &timeline, &dir);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].cycle, 2);
        assert_eq!(report[0].occupant_name, "Second");
        assert_eq!(report[1].occupant_name, "First");
        let seqs: Vec<u64> = report[0].events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
        assert_eq!(report[1].inspected_by, "Priya");
        assert_eq!(report[1].final_amount.to_string(), "15.00");
        assert_eq!(report[1].maintenance, None);
    }

    #[test]
    fn projection_is_pure() {
        let history = vec![closed(1, "Only")];
        let timeline = vec![event(1, 1, TimelineEventKind::MovedIn)];
        let dir = StaticDirectory::new();
        assert_eq!(
            project(&history, &timeline, &dir),
            project(&history, &timeline, &dir)
        );
    }

    #[test]
    fn closed_entry_ignores_later_notes() {
        let history = vec![closed(1, "Only")];
        let mut timeline = vec![
            event(1, 1, TimelineEventKind::MovedIn),
            event(2, 1, TimelineEventKind::SettlementCompleted),
        ];
        let dir = StaticDirectory::new();
        let before = project(&history, &timeline, &dir);
        timeline.push(event(3, 1, TimelineEventKind::Note));
        assert_eq!(project(&history, &timeline, &dir), before);
        assert_eq!(before[0].events.len(), 2);
    }

    #[test]
    fn open_cycle_events_are_not_reported() {
        let timeline = vec![event(1, 1, TimelineEventKind::MovedIn)];
        assert!(project(&[], &timeline, &StaticDirectory::new()).is_empty());
    }
}

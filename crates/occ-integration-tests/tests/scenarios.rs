//! # End-to-end lifecycle scenarios
//!
//! - No-damage move-out: maintenance is skipped entirely.
//! - Damage found, settlement attempted while maintenance is still open.
//! - Two writers racing on the same handover.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use occ_core::{Amount, LifecycleError, Timestamp};
use occ_lifecycle::{Notice, Transition};
use occ_state::{
    Action, InspectionReport, MaintenanceOrigin, MaintenanceSlot, OccupancyStatus,
    SettlementInput, StageKind, StepId, TimelineEventKind,
};

#[test]
fn no_damage_move_out_skips_maintenance() {
    let h = harness("A-101");
    h.move_in("Sam Rao");
    h.through_inspection_request();

    let a = h.inspect(InspectionReport::default());
    assert_eq!(a.record.status, OccupancyStatus::RecentlyVacated);
    let exit = a.record.exit.as_ref().unwrap();
    assert_eq!(exit.maintenance, MaintenanceSlot::Skipped);
    let maintenance = a.evaluation.step(StepId::Maintenance).unwrap();
    assert!(maintenance.completed);
    assert!(!maintenance.visible);
    assert!(a.evaluation.step(StepId::Settlement).unwrap().enabled);

    let a = h.settle("0", "500");
    assert_eq!(a.record.status, OccupancyStatus::Vacant);
    assert!(a.record.occupant.is_none());
    assert_eq!(a.next_actions, vec![Action::MoveIn, Action::AddNote]);

    let history = h.orch.history(&h.space).unwrap();
    assert_eq!(history.len(), 1);
    let closed = &history[0];
    assert_eq!(closed.occupant.name, "Sam Rao");
    assert!(closed.maintenance.is_none());
    assert_eq!(closed.settlement.final_amount, Amount::from_major(500).unwrap());
    assert_eq!(closed.reference_no.as_deref(), Some("LEASE-001"));

    // No maintenance notice was ever sent.
    assert!(!h
        .notices
        .delivered()
        .iter()
        .any(|n| matches!(n, Notice::MaintenanceRequired { .. })));

    let kinds: Vec<TimelineEventKind> = h
        .orch
        .timeline(&h.space)
        .unwrap()
        .into_iter()
        .map(|e| e.event.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TimelineEventKind::MovedIn,
            TimelineEventKind::MoveOutRequested,
            TimelineEventKind::HandoverCompleted,
            TimelineEventKind::InspectionRequested,
            TimelineEventKind::InspectionCompleted,
            TimelineEventKind::SettlementCompleted,
        ]
    );
}

#[test]
fn settlement_refused_while_maintenance_open() {
    let h = harness("B-202");
    h.move_in("Lee Chen");
    h.through_inspection_request();

    let a = h.inspect(damage("cracked bathroom tiles"));
    assert_eq!(a.record.status, OccupancyStatus::HandoverAwaited);
    assert_eq!(a.stage(), Some(StageKind::Maintenance));
    let job = a
        .record
        .exit
        .as_ref()
        .unwrap()
        .maintenance
        .record()
        .unwrap()
        .clone();
    assert_eq!(job.origin, MaintenanceOrigin::DamageReported);
    assert_eq!(job.notes.as_deref(), Some("cracked bathroom tiles"));
    assert!(!a.evaluation.step(StepId::Settlement).unwrap().enabled);

    // No settlement record exists yet; any id is refused.
    let before = h.orch.current(&h.space).unwrap().record;
    let err = h
        .orch
        .complete_settlement(
            &h.space,
            occ_core::SettlementId::new(),
            SettlementInput::new("100", "0"),
        )
        .unwrap_err();
    assert!(matches!(err, LifecycleError::State(_)), "{err:?}");
    assert_eq!(h.orch.current(&h.space).unwrap().record, before);

    h.clock
        .set(Timestamp::parse("2024-06-05T16:00:00Z").unwrap());
    let a = h.finish_maintenance();
    assert_eq!(a.record.status, OccupancyStatus::RecentlyVacated);
    let completed = a.record.exit.as_ref().unwrap().maintenance.record().unwrap();
    assert_eq!(
        completed.completed_at,
        Some(Timestamp::parse("2024-06-05T16:00:00Z").unwrap())
    );

    let a = h.settle("120.50", "79.50");
    assert_eq!(a.record.status, OccupancyStatus::Vacant);
    let history = h.orch.history(&h.space).unwrap();
    assert_eq!(history[0].settlement.final_amount.to_string(), "200.00");
    assert!(history[0].had_maintenance());

    let audit = h.orch.audit(&h.space).unwrap();
    assert_eq!(audit[0].maintenance, Some(MaintenanceOrigin::DamageReported));
    assert_eq!(audit[0].inspected_by, "Priya Nair");
    assert!(audit[0].damage_found);
}

#[test]
fn maintenance_completion_before_creation_refused() {
    let h = harness("B-203");
    h.move_in("Lee Chen");
    h.through_inspection_request();
    let err = h
        .orch
        .complete_maintenance(&h.space, occ_core::MaintenanceId::new(), None)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::State(_)));
}

#[test]
fn concurrent_handover_exactly_one_commits() {
    let h = harness("C-303");
    h.move_in("Ana Silva");
    let a = h
        .orch
        .request_move_out(&h.space, Default::default())
        .unwrap();
    let handover_id = a.record.exit.as_ref().unwrap().handover.id;

    // Both writers read the same record before either commits.
    let snapshot = h.orch.current(&h.space).unwrap().record;
    let store = h.orch.store().clone();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            let current = snapshot.clone();
            thread::spawn(move || {
                let mut next = current.clone();
                next.exit
                    .as_mut()
                    .unwrap()
                    .handover
                    .complete(handover_id, handover_fields(), Timestamp::now())
                    .unwrap();
                next.status = OccupancyStatus::HandoverAwaited;
                barrier.wait();
                store.transition(
                    &current,
                    Transition::new(next, TimelineEventKind::HandoverCompleted),
                    Timestamp::now(),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let committed = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(LifecycleError::Conflict(_))))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(conflicts, 1);

    let stored = h.orch.current(&h.space).unwrap().record;
    assert_eq!(stored.status, OccupancyStatus::HandoverAwaited);
    assert_eq!(stored.revision, snapshot.revision + 1);
    let handover_events = h
        .orch
        .timeline(&h.space)
        .unwrap()
        .iter()
        .filter(|e| e.event.kind == TimelineEventKind::HandoverCompleted)
        .count();
    assert_eq!(handover_events, 1);
}

#[test]
fn concurrent_orchestrator_calls_never_double_commit() {
    let h = harness("C-304");
    h.move_in("Ana Silva");
    let a = h
        .orch
        .request_move_out(&h.space, Default::default())
        .unwrap();
    let handover_id = a.record.exit.as_ref().unwrap().handover.id;
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orch = h.orch.clone();
            let space = h.space.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                orch.complete_handover(&space, handover_id, handover_fields())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    // Losers either lost the swap or read the already-completed handover.
    assert!(results.iter().all(|r| matches!(
        r,
        Ok(_) | Err(LifecycleError::Conflict(_)) | Err(LifecycleError::State(_))
    )));
}

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use occ_core::{
    HandoverId, InspectionId, LifecycleError, MaintenanceId, SettlementId, SpaceId, Timestamp,
    UserId,
};
use occ_lifecycle::{
    Advance, FixedClock, InMemoryPersistence, LifecycleOrchestrator, RecordingNotifier,
    StaticDirectory,
};
use occ_state::{
    Action, HandoverFields, InspectionReport, MoveIn, MoveOutRequest, OccupantType,
    SettlementInput,
};

pub const NOW: &str = "2024-06-01T09:00:00Z";

pub struct Harness {
    pub orch: LifecycleOrchestrator,
    pub backend: InMemoryPersistence,
    pub clock: Arc<FixedClock>,
    pub notices: Arc<RecordingNotifier>,
    pub space: SpaceId,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn inspector() -> UserId {
    UserId::new("insp-1").unwrap()
}

pub fn harness(space: &str) -> Harness {
    let backend = InMemoryPersistence::new();
    let clock = Arc::new(FixedClock::new(Timestamp::parse(NOW).unwrap()));
    let notices = Arc::new(RecordingNotifier::new());
    let orch = LifecycleOrchestrator::new(Arc::new(backend.clone()))
        .with_clock(clock.clone())
        .with_notifier(notices.clone())
        .with_directory(Arc::new(
            StaticDirectory::new().with_user(inspector(), "Priya Nair"),
        ));
    Harness {
        orch,
        backend,
        clock,
        notices,
        space: SpaceId::new(space).unwrap(),
    }
}

pub fn tenant(name: &str) -> MoveIn {
    MoveIn {
        occupant_type: OccupantType::Tenant,
        occupant_name: name.into(),
        move_in_date: date(2023, 6, 1),
        reference_no: Some("LEASE-001".into()),
    }
}

pub fn handover_fields() -> HandoverFields {
    HandoverFields {
        handover_date: Some(date(2024, 6, 1)),
        handover_to_person: Some("Facility desk".into()),
        ..HandoverFields::default()
    }
}

pub fn damage(notes: &str) -> InspectionReport {
    InspectionReport {
        damage_found: true,
        damage_notes: Some(notes.into()),
        walls_condition: Some("scuffed".into()),
        ..InspectionReport::default()
    }
}

impl Harness {
    pub fn move_in(&self, name: &str) -> Advance {
        self.orch.move_in(&self.space, tenant(name)).unwrap()
    }

    /// Occupied → move_out_scheduled → handover_awaited with an inspection
    /// requested for tomorrow.
    pub fn through_inspection_request(&self) -> Advance {
        let a = self
            .orch
            .request_move_out(
                &self.space,
                MoveOutRequest {
                    move_out_date: Some(date(2024, 6, 1)),
                    notes: Some("lease ended".into()),
                },
            )
            .unwrap();
        let handover_id = a.record.exit.as_ref().unwrap().handover.id;
        self.orch
            .complete_handover(&self.space, handover_id, handover_fields())
            .unwrap();
        self.orch
            .request_inspection(&self.space, handover_id, date(2024, 6, 2), inspector())
            .unwrap()
    }

    pub fn inspect(&self, report: InspectionReport) -> Advance {
        let current = self.orch.current(&self.space).unwrap();
        let id = current.record.exit.unwrap().inspection.unwrap().id;
        self.orch
            .complete_inspection(&self.space, id, report)
            .unwrap()
    }

    pub fn finish_maintenance(&self) -> Advance {
        let current = self.orch.current(&self.space).unwrap();
        let id = current.record.exit.unwrap().maintenance.record().unwrap().id;
        self.orch
            .complete_maintenance(&self.space, id, None)
            .unwrap()
    }

    pub fn settle(&self, damage_charges: &str, pending_dues: &str) -> Advance {
        let current = self.orch.current(&self.space).unwrap();
        let id = current.record.exit.unwrap().settlement.unwrap().id;
        self.orch
            .complete_settlement(
                &self.space,
                id,
                SettlementInput::new(damage_charges, pending_dues),
            )
            .unwrap()
    }

    /// One full cycle without damage.
    pub fn full_cycle(&self, name: &str) -> Advance {
        self.move_in(name);
        self.through_inspection_request();
        self.inspect(InspectionReport::default());
        self.settle("0", "0")
    }
}

/// Apply `action` to the harness's space using whatever stage ids are
/// currently open. Returns the operation's result.
pub fn apply(h: &Harness, action: Action, damage_found: bool) -> Result<(), LifecycleError> {
    let current = h.orch.current(&h.space)?.record;
    let exit = current.exit.clone();
    let result = match action {
        Action::MoveIn => h.orch.move_in(&h.space, tenant("Prop Tenant")),
        Action::RequestMoveOut => h.orch.request_move_out(&h.space, Default::default()),
        Action::CancelMoveOut => h.orch.cancel_move_out(&h.space, None),
        Action::SaveHandoverDraft => match exit {
            Some(e) => h
                .orch
                .save_handover_draft(&h.space, e.handover.id, handover_fields()),
            None => h.orch.save_handover_draft(
                &h.space,
                HandoverId::new(),
                handover_fields(),
            ),
        },
        Action::CompleteHandover => {
            let id = exit
                .map(|e| e.handover.id)
                .unwrap_or_else(HandoverId::new);
            h.orch.complete_handover(&h.space, id, handover_fields())
        }
        Action::RequestInspection => {
            let id = exit
                .map(|e| e.handover.id)
                .unwrap_or_else(HandoverId::new);
            h.orch
                .request_inspection(&h.space, id, date(2024, 6, 3), inspector())
        }
        Action::RescheduleInspection => {
            let id = exit
                .and_then(|e| e.inspection.map(|i| i.id))
                .unwrap_or_else(InspectionId::new);
            h.orch
                .reschedule_inspection(&h.space, id, date(2024, 6, 4), inspector())
        }
        Action::CompleteInspection => {
            let id = exit
                .and_then(|e| e.inspection.map(|i| i.id))
                .unwrap_or_else(InspectionId::new);
            let report = InspectionReport {
                damage_found,
                ..InspectionReport::default()
            };
            h.orch.complete_inspection(&h.space, id, report)
        }
        Action::CompleteMaintenance => {
            let id = exit
                .and_then(|e| e.maintenance.record().map(|m| m.id))
                .unwrap_or_else(MaintenanceId::new);
            h.orch.complete_maintenance(&h.space, id, None)
        }
        Action::CompleteSettlement => {
            let id = exit
                .and_then(|e| e.settlement.map(|s| s.id))
                .unwrap_or_else(SettlementId::new);
            h.orch
                .complete_settlement(&h.space, id, SettlementInput::new(1u32, 2u32))
        }
        Action::AddNote => h.orch.add_note(&h.space, "walkthrough"),
    };
    result.map(|_| ())
}

pub const ALL_ACTIONS: [Action; 11] = [
    Action::MoveIn,
    Action::RequestMoveOut,
    Action::CancelMoveOut,
    Action::SaveHandoverDraft,
    Action::CompleteHandover,
    Action::RequestInspection,
    Action::RescheduleInspection,
    Action::CompleteInspection,
    Action::CompleteMaintenance,
    Action::CompleteSettlement,
    Action::AddNote,
];

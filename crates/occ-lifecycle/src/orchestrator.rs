//! # Lifecycle Orchestrator
//!
//! Sequences the exit workflow of a space:
//!
//! ```text
//! vacant ──move_in──▶ occupied ──request_move_out──▶ move_out_scheduled
//!                        ▲                                │
//!                        └────────cancel_move_out─────────┤
//!                                                         │ complete_handover
//!                                                         ▼
//!   request_inspection / reschedule_inspection ─▶ handover_awaited
//!                                                         │ complete_inspection
//!                              ┌──────── damage ──────────┤
//!                              ▼                          │ no damage
//!                    [maintenance open]                   │
//!                              │ complete_maintenance     │
//!                              ▼                          ▼
//!                           recently_vacated ◀────────────┘
//!                              │ complete_settlement
//!                              ▼
//!                           vacant (cycle archived)
//! ```
//!
//! Each operation reads the current record, lets the record or the active
//! stage validate and mutate a working copy, and commits the copy through
//! the store's compare-and-swap. Stage records are created here and only
//! here. Notices are sent after the commit and cannot undo it.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use occ_core::{
    HandoverId, InspectionId, LifecycleError, MaintenanceId, SettlementId, SpaceId, StateError,
    Timestamp, UserId,
};
use occ_state::{
    evaluate, permitted_actions, Action, ActiveStage, ClosedCycle, Evaluation, ExitWorkflow,
    HandoverFields, HandoverInfo, Inspection, InspectionReport, Maintenance, MaintenanceDecision,
    MaintenanceSlot, MoveIn, MoveOutRequest, OccupancyRecord, OccupancyStatus, SequencedEvent,
    Settlement, SettlementInput, StageKind, TimelineEventKind,
};

use crate::audit::{self, AuditEntry};
use crate::clock::{Clock, SystemClock};
use crate::config::LifecycleConfig;
use crate::directory::{Directory, StaticDirectory};
use crate::notify::{dispatch, Notice, Notifier, TracingNotifier};
use crate::persistence::Persistence;
use crate::store::{OccupancyStore, Transition};

/// The outcome of an operation: the record as now stored, its evaluation,
/// and what may be done next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advance {
    pub record: OccupancyRecord,
    pub evaluation: Evaluation,
    pub next_actions: Vec<Action>,
    /// Sequence number of the event this operation appended, if any.
    pub event_seq: Option<u64>,
}

impl Advance {
    fn of(record: OccupancyRecord, event_seq: Option<u64>) -> Self {
        let evaluation = evaluate(&record);
        let next_actions = permitted_actions(&record);
        tracing::debug!(
            space = %record.space_id,
            status = %record.status,
            current_step = evaluation.current_step_index,
            actions = ?next_actions,
            "record evaluated"
        );
        Self {
            record,
            evaluation,
            next_actions,
            event_seq,
        }
    }

    /// The open exit stage, if an exit is in progress.
    pub fn stage(&self) -> Option<StageKind> {
        self.record.stage()
    }
}

/// Drives occupancy records through their lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleOrchestrator {
    store: OccupancyStore,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl LifecycleOrchestrator {
    /// An orchestrator over `backend` with the system clock, default
    /// configuration, an empty directory, and `tracing` notices.
    pub fn new(backend: Arc<dyn Persistence>) -> Self {
        Self {
            store: OccupancyStore::new(backend),
            notifier: Arc::new(TracingNotifier),
            directory: Arc::new(StaticDirectory::new()),
            clock: Arc::new(SystemClock),
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying record store.
    pub fn store(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // -- Queries --------------------------------------------------------------

    /// The current record with its evaluation; appends nothing.
    pub fn current(&self, space: &SpaceId) -> Result<Advance, LifecycleError> {
        Ok(Advance::of(self.store.get_current(space)?, None))
    }

    /// Evaluate the current record's exit steps.
    pub fn evaluate(&self, space: &SpaceId) -> Result<Evaluation, LifecycleError> {
        Ok(evaluate(&self.store.get_current(space)?))
    }

    /// Closed cycles, most recent first.
    pub fn history(&self, space: &SpaceId) -> Result<Vec<ClosedCycle>, LifecycleError> {
        self.store.get_history(space)
    }

    /// The space's event log, ascending.
    pub fn timeline(&self, space: &SpaceId) -> Result<Vec<SequencedEvent>, LifecycleError> {
        self.store.timeline(space)
    }

    /// Audit report of every closed cycle, most recent first.
    pub fn audit(&self, space: &SpaceId) -> Result<Vec<AuditEntry>, LifecycleError> {
        let history = self.store.get_history(space)?;
        let timeline = self.store.timeline(space)?;
        Ok(audit::project(&history, &timeline, self.directory.as_ref()))
    }

    // -- Occupancy --------------------------------------------------------------

    /// Record a new occupant on a vacant space.
    pub fn move_in(&self, space: &SpaceId, req: MoveIn) -> Result<Advance, LifecycleError> {
        self.run("move in", space, |current, now| {
            let mut next = current.clone();
            next.move_in(req)?;
            next.status = OccupancyStatus::Occupied;
            self.commit(current, Transition::new(next, TimelineEventKind::MovedIn), now)
        })
    }

    /// Open the exit workflow with a fresh handover.
    pub fn request_move_out(
        &self,
        space: &SpaceId,
        req: MoveOutRequest,
    ) -> Result<Advance, LifecycleError> {
        self.run("request move-out", space, |current, now| {
            let mut next = current.clone();
            next.schedule_move_out(&req, HandoverInfo::new(HandoverId::new()))?;
            next.status = OccupancyStatus::MoveOutScheduled;
            let change =
                Transition::new(next, TimelineEventKind::MoveOutRequested).with_notes(req.notes);
            self.commit(current, change, now)
        })
    }

    /// Withdraw a move-out before its handover is completed.
    pub fn cancel_move_out(
        &self,
        space: &SpaceId,
        notes: Option<String>,
    ) -> Result<Advance, LifecycleError> {
        self.run("cancel move-out", space, |current, now| {
            let mut next = current.clone();
            next.cancel_move_out()?;
            next.status = OccupancyStatus::Occupied;
            let change =
                Transition::new(next, TimelineEventKind::MoveOutCancelled).with_notes(notes);
            self.commit(current, change, now)
        })
    }

    // -- Handover ---------------------------------------------------------------

    /// Save handover fields without submitting.
    pub fn save_handover_draft(
        &self,
        space: &SpaceId,
        handover_id: HandoverId,
        fields: HandoverFields,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "save handover draft";
        self.run(OP, space, |current, now| {
            let mut next = current.clone();
            match active_stage(&mut next, OP)? {
                ActiveStage::Handover(h) => h.save_draft(handover_id, fields)?,
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            }
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::HandoverDraftSaved),
                now,
            )
        })
    }

    /// Submit the handover. The inspection step becomes available.
    pub fn complete_handover(
        &self,
        space: &SpaceId,
        handover_id: HandoverId,
        fields: HandoverFields,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "complete handover";
        self.run(OP, space, |current, now| {
            let mut next = current.clone();
            let remarks = match active_stage(&mut next, OP)? {
                ActiveStage::Handover(h) => {
                    h.complete(handover_id, fields, now)?;
                    h.remarks.clone()
                }
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            };
            next.status = OccupancyStatus::HandoverAwaited;
            let change =
                Transition::new(next, TimelineEventKind::HandoverCompleted).with_notes(remarks);
            self.commit(current, change, now)
        })
    }

    // -- Inspection -------------------------------------------------------------

    /// Schedule the inspection of a handed-over space.
    pub fn request_inspection(
        &self,
        space: &SpaceId,
        handover_id: HandoverId,
        scheduled_date: NaiveDate,
        inspector: UserId,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "request inspection";
        let today = self.today();
        let advance = self.run(OP, space, |current, now| {
            let mut next = current.clone();
            let inspection = match active_stage(&mut next, OP)? {
                ActiveStage::InspectionRequest(h) => {
                    if h.id != handover_id {
                        return Err(StateError::new(
                            OP,
                            current.status,
                            format!("{handover_id} is not the completed handover ({})", h.id),
                        )
                        .into());
                    }
                    Inspection::request(InspectionId::new(), h, scheduled_date, inspector, today)?
                }
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            };
            exit_mut(&mut next, OP)?.inspection = Some(inspection);
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::InspectionRequested),
                now,
            )
        })?;
        self.notify_inspection_scheduled(&advance);
        Ok(advance)
    }

    /// Move a requested inspection to another date or inspector.
    pub fn reschedule_inspection(
        &self,
        space: &SpaceId,
        inspection_id: InspectionId,
        scheduled_date: NaiveDate,
        inspector: UserId,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "reschedule inspection";
        let today = self.today();
        let advance = self.run(OP, space, |current, now| {
            let mut next = current.clone();
            match active_stage(&mut next, OP)? {
                ActiveStage::Inspection(i) => {
                    i.reschedule(inspection_id, scheduled_date, inspector, today)?
                }
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            }
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::InspectionRescheduled),
                now,
            )
        })?;
        self.notify_inspection_scheduled(&advance);
        Ok(advance)
    }

    /// Record inspection findings.
    ///
    /// This is the only point where maintenance is decided. A required
    /// decision opens a maintenance job in the same transition; a skip opens
    /// the settlement and moves the space to `recently_vacated`.
    pub fn complete_inspection(
        &self,
        space: &SpaceId,
        inspection_id: InspectionId,
        report: InspectionReport,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "complete inspection";
        let policy = self.config.inspection_policy();
        let advance = self.run(OP, space, |current, now| {
            let mut next = current.clone();
            let decision = match active_stage(&mut next, OP)? {
                ActiveStage::Inspection(i) => i.complete(inspection_id, report, policy, now)?,
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            };

            let exit = exit_mut(&mut next, OP)?;
            let notes = exit
                .inspection
                .as_ref()
                .and_then(|i| i.findings.as_ref())
                .and_then(|f| f.damage_notes.clone());
            match decision {
                MaintenanceDecision::Skip => {
                    exit.maintenance = MaintenanceSlot::Skipped;
                    exit.settlement = Some(Settlement::open(SettlementId::new()));
                    next.status = OccupancyStatus::RecentlyVacated;
                }
                MaintenanceDecision::Required { .. } => {
                    let inspection = exit.inspection.as_ref().ok_or_else(|| {
                        StateError::new(OP, current.status, "inspection record missing")
                    })?;
                    let job = Maintenance::create(MaintenanceId::new(), inspection, true, notes)?;
                    exit.maintenance = MaintenanceSlot::Required(job);
                }
            }
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::InspectionCompleted),
                now,
            )
        })?;

        if let Some(job) = advance
            .record
            .exit
            .as_ref()
            .and_then(|e| e.maintenance.record())
        {
            dispatch(
                self.notifier.as_ref(),
                Notice::MaintenanceRequired {
                    space_id: advance.record.space_id.clone(),
                    maintenance_id: job.id,
                    origin: job.origin,
                },
            );
        }
        Ok(advance)
    }

    // -- Maintenance ------------------------------------------------------------

    /// Close the open maintenance job and open the settlement.
    pub fn complete_maintenance(
        &self,
        space: &SpaceId,
        maintenance_id: MaintenanceId,
        completed_at: Option<Timestamp>,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "complete maintenance";
        self.run(OP, space, |current, now| {
            let mut next = current.clone();
            match active_stage(&mut next, OP)? {
                ActiveStage::Maintenance(m) => m.complete(maintenance_id, completed_at, now)?,
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            }
            exit_mut(&mut next, OP)?.settlement = Some(Settlement::open(SettlementId::new()));
            next.status = OccupancyStatus::RecentlyVacated;
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::MaintenanceCompleted),
                now,
            )
        })
    }

    // -- Settlement -------------------------------------------------------------

    /// Settle the exit, archive the cycle, and return the space to vacant.
    pub fn complete_settlement(
        &self,
        space: &SpaceId,
        settlement_id: SettlementId,
        input: SettlementInput,
    ) -> Result<Advance, LifecycleError> {
        const OP: &str = "complete settlement";
        let mut closed_notice = None;
        let advance = self.run(OP, space, |current, now| {
            let mut next = current.clone();
            match active_stage(&mut next, OP)? {
                ActiveStage::Settlement(s) => s.complete(settlement_id, &input, now)?,
                other => return Err(wrong_stage(OP, current.status, other.kind()).into()),
            }
            let closed = next.close_cycle(now)?;
            next.status = OccupancyStatus::Vacant;
            closed_notice = Some(Notice::CycleClosed {
                space_id: closed.space_id.clone(),
                cycle: closed.cycle,
                final_amount: closed.settlement.final_amount,
            });
            self.commit(
                current,
                Transition::new(next, TimelineEventKind::SettlementCompleted).closing(closed),
                now,
            )
        })?;
        if let Some(notice) = closed_notice {
            dispatch(self.notifier.as_ref(), notice);
        }
        Ok(advance)
    }

    // -- Notes ------------------------------------------------------------------

    /// Append an operator note to the space's timeline.
    pub fn add_note(&self, space: &SpaceId, note: &str) -> Result<Advance, LifecycleError> {
        let seq = self.store.append_note(space, note, self.clock.now())?;
        Ok(Advance::of(self.store.get_current(space)?, Some(seq)))
    }

    // -- Internals --------------------------------------------------------------

    fn today(&self) -> NaiveDate {
        self.clock.now().local_date(self.config.utc_offset_minutes)
    }

    /// Load the current record and run `op` against it, logging rejection.
    fn run(
        &self,
        operation: &'static str,
        space: &SpaceId,
        op: impl FnOnce(&OccupancyRecord, Timestamp) -> Result<Advance, LifecycleError>,
    ) -> Result<Advance, LifecycleError> {
        let result = self
            .store
            .get_current(space)
            .and_then(|current| op(&current, self.clock.now()));
        if let Err(e) = &result {
            tracing::debug!(space = %space, operation, error = %e, "operation rejected");
        }
        result
    }

    fn commit(
        &self,
        current: &OccupancyRecord,
        change: Transition,
        now: Timestamp,
    ) -> Result<Advance, LifecycleError> {
        let committed = self.store.transition(current, change, now)?;
        Ok(Advance::of(committed.record, Some(committed.event_seq)))
    }

    fn notify_inspection_scheduled(&self, advance: &Advance) {
        let Some(inspection) = advance
            .record
            .exit
            .as_ref()
            .and_then(|e| e.inspection.as_ref())
        else {
            return;
        };
        dispatch(
            self.notifier.as_ref(),
            Notice::InspectionScheduled {
                space_id: advance.record.space_id.clone(),
                inspection_id: inspection.id,
                scheduled_date: inspection.scheduled_date,
                inspector: self.directory.display_name_or_id(&inspection.inspected_by),
            },
        );
    }
}

fn exit_mut<'r>(
    record: &'r mut OccupancyRecord,
    operation: &str,
) -> Result<&'r mut ExitWorkflow, StateError> {
    let status = record.status;
    record
        .exit
        .as_mut()
        .ok_or_else(|| StateError::new(operation, status, "no move-out is in progress"))
}

fn active_stage<'r>(
    record: &'r mut OccupancyRecord,
    operation: &str,
) -> Result<ActiveStage<'r>, StateError> {
    let status = record.status;
    exit_mut(record, operation)?
        .active_stage()
        .ok_or_else(|| StateError::new(operation, status, "no exit stage is open"))
}

fn wrong_stage(operation: &str, status: OccupancyStatus, open: StageKind) -> StateError {
    StateError::new(operation, status, format!("the open stage is {open}"))
}

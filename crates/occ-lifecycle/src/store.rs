//! # OccupancyRecord Store
//!
//! Validating front of a [`Persistence`] backend. Every status change goes
//! through [`OccupancyStore::transition`], which checks the lifecycle edge
//! and the record invariants, stamps the next revision, builds the
//! timeline event, and hands the whole write to the backend's
//! compare-and-swap.

use std::sync::Arc;

use occ_core::{LifecycleError, SpaceId, StateError, Timestamp, ValidationError};
use occ_state::{ClosedCycle, OccupancyRecord, SequencedEvent, TimelineEvent, TimelineEventKind};

use crate::persistence::{ExpectedState, Persistence, TransitionWrite};

/// A proposed change to one space's current record.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The record as it should be stored. Its revision and `updated_at` are
    /// assigned by the store.
    pub next: OccupancyRecord,
    pub kind: TimelineEventKind,
    pub notes: Option<String>,
    /// Snapshot to archive atomically with this transition.
    pub closed_cycle: Option<ClosedCycle>,
}

impl Transition {
    pub fn new(next: OccupancyRecord, kind: TimelineEventKind) -> Self {
        Self {
            next,
            kind,
            notes: None,
            closed_cycle: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn closing(mut self, closed: ClosedCycle) -> Self {
        self.closed_cycle = Some(closed);
        self
    }
}

/// A committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub record: OccupancyRecord,
    pub event_seq: u64,
}

/// Record store over a shared persistence backend.
#[derive(Debug, Clone)]
pub struct OccupancyStore {
    backend: Arc<dyn Persistence>,
}

impl OccupancyStore {
    pub fn new(backend: Arc<dyn Persistence>) -> Self {
        Self { backend }
    }

    /// The current record; a space never written reads as vacant at
    /// revision 0.
    pub fn get_current(&self, space: &SpaceId) -> Result<OccupancyRecord, LifecycleError> {
        Ok(self
            .backend
            .load_occupancy(space)?
            .unwrap_or_else(|| OccupancyRecord::vacant(space.clone())))
    }

    /// Closed cycles, most recent first.
    pub fn get_history(&self, space: &SpaceId) -> Result<Vec<ClosedCycle>, LifecycleError> {
        let mut history = self.backend.load_history(space)?;
        history.sort_by(|a, b| b.cycle.cmp(&a.cycle));
        Ok(history)
    }

    /// The event log, ascending by sequence number.
    pub fn timeline(&self, space: &SpaceId) -> Result<Vec<SequencedEvent>, LifecycleError> {
        let mut events = self.backend.load_timeline(space)?;
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    /// Compare-and-swap `current` for `change.next`.
    ///
    /// `current` is the record the caller read; its status and revision are
    /// the expectation the backend checks. A same-status write (a stage
    /// update) is allowed; any other status change must be an edge of the
    /// lifecycle graph.
    ///
    /// # Errors
    ///
    /// - [`StateError`] for a disallowed edge, a foreign space, or a next
    ///   record that breaks the invariants of its status.
    /// - [`occ_core::ConflictError`] if the stored record moved on.
    /// - [`occ_core::PersistenceError`] from the backend.
    pub fn transition(
        &self,
        current: &OccupancyRecord,
        change: Transition,
        now: Timestamp,
    ) -> Result<Committed, LifecycleError> {
        let Transition {
            mut next,
            kind,
            notes,
            closed_cycle,
        } = change;

        if next.space_id != current.space_id {
            return Err(StateError::new(
                kind.label(),
                current.status,
                format!("record belongs to {}, not {}", next.space_id, current.space_id),
            )
            .into());
        }
        if next.status != current.status && !current.status.can_transition_to(next.status) {
            return Err(StateError::new(
                kind.label(),
                current.status,
                format!("{} is not reachable from {}", next.status, current.status),
            )
            .into());
        }
        next.check_invariants()?;

        next.revision = current.revision + 1;
        next.updated_at = Some(now);
        let event = TimelineEvent::for_transition(current, &next, kind, now, notes);
        let write = TransitionWrite {
            record: next.clone(),
            event,
            closed_cycle,
        };

        match self.backend.save_transition(ExpectedState::of(current), write) {
            Ok(event_seq) => {
                tracing::info!(
                    space = %next.space_id,
                    from = %current.status,
                    to = %next.status,
                    revision = next.revision,
                    event = %kind,
                    seq = event_seq,
                    "transition committed"
                );
                Ok(Committed {
                    record: next,
                    event_seq,
                })
            }
            Err(e) => {
                tracing::warn!(
                    space = %next.space_id,
                    from = %current.status,
                    to = %next.status,
                    error = %e,
                    "transition rejected"
                );
                Err(e)
            }
        }
    }

    /// Append an operator note to the space's timeline without changing
    /// its record.
    pub fn append_note(
        &self,
        space: &SpaceId,
        note: &str,
        now: Timestamp,
    ) -> Result<u64, LifecycleError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(ValidationError::missing("notes").into());
        }
        let current = self.get_current(space)?;
        let event = TimelineEvent::note(&current, now, note.to_string());
        let seq = self.backend.append_timeline_event(space, event)?;
        tracing::debug!(space = %space, seq, "note appended");
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;
    use chrono::NaiveDate;
    use occ_state::{MoveIn, OccupancyStatus, OccupantType};

    fn store() -> OccupancyStore {
        OccupancyStore::new(Arc::new(InMemoryPersistence::new()))
    }

    fn space() -> SpaceId {
        SpaceId::new("D-12").unwrap()
    }

    fn move_in_change(current: &OccupancyRecord) -> Transition {
        let mut next = current.clone();
        next.move_in(MoveIn {
            occupant_type: OccupantType::Owner,
            occupant_name: "Farah".into(),
            move_in_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reference_no: None,
        })
        .unwrap();
        next.status = OccupancyStatus::Occupied;
        Transition::new(next, TimelineEventKind::MovedIn)
    }

    #[test]
    fn unknown_space_is_vacant() {
        let s = store();
        let r = s.get_current(&space()).unwrap();
        assert_eq!(r.status, OccupancyStatus::Vacant);
        assert_eq!(r.revision, 0);
        assert!(s.get_history(&space()).unwrap().is_empty());
    }

    #[test]
    fn transition_bumps_revision_and_logs_event() {
        let s = store();
        let current = s.get_current(&space()).unwrap();
        let committed = s
            .transition(&current, move_in_change(&current), Timestamp::now())
            .unwrap();
        assert_eq!(committed.record.revision, 1);
        assert_eq!(committed.event_seq, 1);
        assert_eq!(s.get_current(&space()).unwrap(), committed.record);

        let timeline = s.timeline(&space()).unwrap();
        assert_eq!(timeline.len(), 1);
        let event = &timeline[0].event;
        assert_eq!(event.kind, TimelineEventKind::MovedIn);
        assert_eq!(event.from_status, OccupancyStatus::Vacant);
        assert_eq!(event.to_status, OccupancyStatus::Occupied);
        assert_eq!(event.occupant_name.as_deref(), Some("Farah"));
        assert_eq!(event.cycle, 1);
    }

    #[test]
    fn stale_read_conflicts() {
        let s = store();
        let stale = s.get_current(&space()).unwrap();
        s.transition(&stale, move_in_change(&stale), Timestamp::now())
            .unwrap();
        let err = s
            .transition(&stale, move_in_change(&stale), Timestamp::now())
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(s.timeline(&space()).unwrap().len(), 1);
    }

    #[test]
    fn illegal_edge_rejected() {
        let s = store();
        let current = s.get_current(&space()).unwrap();
        let mut next = current.clone();
        next.status = OccupancyStatus::RecentlyVacated;
        let err = s
            .transition(
                &current,
                Transition::new(next, TimelineEventKind::SettlementCompleted),
                Timestamp::now(),
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
        assert!(s.timeline(&space()).unwrap().is_empty());
    }

    #[test]
    fn invariant_violation_rejected() {
        let s = store();
        let current = s.get_current(&space()).unwrap();
        let mut next = current.clone();
        // Occupied without an occupant.
        next.status = OccupancyStatus::Occupied;
        let err = s
            .transition(
                &current,
                Transition::new(next, TimelineEventKind::MovedIn),
                Timestamp::now(),
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }

    #[test]
    fn notes_append_without_status_change() {
        let s = store();
        let seq = s.append_note(&space(), "  meter read  ", Timestamp::now()).unwrap();
        assert_eq!(seq, 1);
        let timeline = s.timeline(&space()).unwrap();
        assert_eq!(timeline[0].event.kind, TimelineEventKind::Note);
        assert_eq!(timeline[0].event.notes.as_deref(), Some("meter read"));
        assert_eq!(s.get_current(&space()).unwrap().revision, 0);

        assert!(matches!(
            s.append_note(&space(), "   ", Timestamp::now()),
            Err(LifecycleError::Validation(_))
        ));
    }
}

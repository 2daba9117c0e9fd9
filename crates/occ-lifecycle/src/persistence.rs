//! # Persistence Backend
//!
//! The storage collaborator behind [`crate::OccupancyStore`]. A backend
//! keeps, per space, one current record, an append-only event log, and the
//! archive of closed cycles.
//!
//! [`Persistence::save_transition`] is the only way to replace a current
//! record. It is a compare-and-swap on (status, revision) and commits the
//! record, its timeline event, and an optional closed-cycle snapshot as one
//! unit: either all three become visible or none does.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use occ_core::{ConflictError, LifecycleError, PersistenceError, SpaceId};
use occ_state::{ClosedCycle, OccupancyRecord, OccupancyStatus, SequencedEvent, TimelineEvent};

/// The (status, revision) a writer read before computing its change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    pub status: OccupancyStatus,
    pub revision: u64,
}

impl ExpectedState {
    /// The state `record` was read in.
    pub fn of(record: &OccupancyRecord) -> Self {
        Self {
            status: record.status,
            revision: record.revision,
        }
    }
}

/// Everything one transition writes.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub record: OccupancyRecord,
    pub event: TimelineEvent,
    pub closed_cycle: Option<ClosedCycle>,
}

/// Storage for occupancy records, timelines, and history.
pub trait Persistence: Send + Sync + fmt::Debug {
    /// The stored current record, or `None` if the space was never written.
    fn load_occupancy(&self, space: &SpaceId) -> Result<Option<OccupancyRecord>, PersistenceError>;

    /// Atomically replace the current record if it still matches
    /// `expected`, appending the event and any closed cycle.
    ///
    /// Returns the sequence number assigned to the event.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Conflict`] when the stored state differs from
    ///   `expected`. Nothing is written.
    /// - [`LifecycleError::Persistence`] when the backend fails. Nothing is
    ///   written.
    fn save_transition(
        &self,
        expected: ExpectedState,
        write: TransitionWrite,
    ) -> Result<u64, LifecycleError>;

    /// Append an event that changes no record. Returns its sequence number.
    fn append_timeline_event(
        &self,
        space: &SpaceId,
        event: TimelineEvent,
    ) -> Result<u64, PersistenceError>;

    /// Closed cycles in the order they were archived.
    fn load_history(&self, space: &SpaceId) -> Result<Vec<ClosedCycle>, PersistenceError>;

    /// The event log, ascending by sequence number.
    fn load_timeline(&self, space: &SpaceId) -> Result<Vec<SequencedEvent>, PersistenceError>;
}

#[derive(Debug, Default)]
struct SpaceEntry {
    record: Option<OccupancyRecord>,
    timeline: Vec<SequencedEvent>,
    history: Vec<ClosedCycle>,
}

impl SpaceEntry {
    fn push_event(&mut self, event: TimelineEvent) -> u64 {
        let seq = self.timeline.last().map_or(1, |e| e.seq + 1);
        self.timeline.push(SequencedEvent { seq, event });
        seq
    }
}

/// Thread-safe, cloneable in-memory backend.
///
/// All state sits behind one `parking_lot::RwLock`, so each
/// `save_transition` runs its compare and its writes under a single write
/// guard. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    spaces: Arc<RwLock<HashMap<SpaceId, SpaceEntry>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with
    /// [`PersistenceError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Spaces with any stored data.
    pub fn spaces(&self) -> Vec<SpaceId> {
        let mut ids: Vec<SpaceId> = self.spaces.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "in-memory backend switched off".into(),
            ));
        }
        Ok(())
    }
}

impl Persistence for InMemoryPersistence {
    fn load_occupancy(&self, space: &SpaceId) -> Result<Option<OccupancyRecord>, PersistenceError> {
        self.check_available()?;
        Ok(self.spaces.read().get(space).and_then(|e| e.record.clone()))
    }

    fn save_transition(
        &self,
        expected: ExpectedState,
        write: TransitionWrite,
    ) -> Result<u64, LifecycleError> {
        self.check_available()?;
        let space = write.record.space_id.clone();
        let mut guard = self.spaces.write();

        let (actual_status, actual_revision) = guard
            .get(&space)
            .and_then(|e| e.record.as_ref())
            .map_or((OccupancyStatus::Vacant, 0), |r| (r.status, r.revision));
        if actual_status != expected.status || actual_revision != expected.revision {
            return Err(ConflictError {
                space_id: space.to_string(),
                expected_status: expected.status.to_string(),
                expected_revision: expected.revision,
                actual_status: actual_status.to_string(),
                actual_revision,
            }
            .into());
        }

        let entry = guard.entry(space).or_default();
        entry.record = Some(write.record);
        if let Some(closed) = write.closed_cycle {
            entry.history.push(closed);
        }
        Ok(entry.push_event(write.event))
    }

    fn append_timeline_event(
        &self,
        space: &SpaceId,
        event: TimelineEvent,
    ) -> Result<u64, PersistenceError> {
        self.check_available()?;
        let mut guard = self.spaces.write();
        Ok(guard.entry(space.clone()).or_default().push_event(event))
    }

    fn load_history(&self, space: &SpaceId) -> Result<Vec<ClosedCycle>, PersistenceError> {
        self.check_available()?;
        Ok(self
            .spaces
            .read()
            .get(space)
            .map(|e| e.history.clone())
            .unwrap_or_default())
    }

    fn load_timeline(&self, space: &SpaceId) -> Result<Vec<SequencedEvent>, PersistenceError> {
        self.check_available()?;
        Ok(self
            .spaces
            .read()
            .get(space)
            .map(|e| e.timeline.clone())
            .unwrap_or_default())
    }
}

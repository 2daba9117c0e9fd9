//! # Advisory Notices
//!
//! Notices are fire-and-forget. They are sent after the transition that
//! caused them has committed; a delivery failure is logged and never rolls
//! the transition back.

use std::fmt;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use occ_core::{Amount, InspectionId, MaintenanceId, SpaceId};
use occ_state::MaintenanceOrigin;

/// An advisory message for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    InspectionScheduled {
        space_id: SpaceId,
        inspection_id: InspectionId,
        scheduled_date: NaiveDate,
        /// Display name of the inspector.
        inspector: String,
    },
    MaintenanceRequired {
        space_id: SpaceId,
        maintenance_id: MaintenanceId,
        origin: MaintenanceOrigin,
    },
    CycleClosed {
        space_id: SpaceId,
        cycle: u32,
        final_amount: Amount,
    },
}

impl Notice {
    pub fn space_id(&self) -> &SpaceId {
        match self {
            Self::InspectionScheduled { space_id, .. }
            | Self::MaintenanceRequired { space_id, .. }
            | Self::CycleClosed { space_id, .. } => space_id,
        }
    }
}

/// Notice delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notice delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers notices.
pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Emits every notice as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        match notice {
            Notice::InspectionScheduled {
                space_id,
                inspection_id,
                scheduled_date,
                inspector,
            } => tracing::info!(
                space = %space_id,
                inspection = %inspection_id,
                %scheduled_date,
                %inspector,
                "inspection scheduled"
            ),
            Notice::MaintenanceRequired {
                space_id,
                maintenance_id,
                origin,
            } => tracing::info!(
                space = %space_id,
                maintenance = %maintenance_id,
                ?origin,
                "maintenance required"
            ),
            Notice::CycleClosed {
                space_id,
                cycle,
                final_amount,
            } => tracing::info!(
                space = %space_id,
                cycle,
                %final_amount,
                "occupancy cycle closed"
            ),
        }
        Ok(())
    }
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &Notice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Keeps delivered notices in memory; optionally fails every delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notice>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries always fail (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Notices delivered so far.
    pub fn delivered(&self) -> Vec<Notice> {
        self.delivered.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError("recording notifier set to fail".into()));
        }
        self.delivered.lock().push(notice.clone());
        Ok(())
    }
}

/// Send `notice`, logging rather than propagating a failure.
pub(crate) fn dispatch(notifier: &dyn Notifier, notice: Notice) {
    if let Err(e) = notifier.notify(&notice) {
        tracing::warn!(space = %notice.space_id(), error = %e, "notice not delivered");
    }
}

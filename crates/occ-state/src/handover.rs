//! # Handover Stage
//!
//! The first exit stage: the departing occupant hands back keys, cards and
//! accessories to a named person on a given date.
//!
//! ```text
//! NOT_STARTED ──save_draft()──▶ IN_PROGRESS ──complete()──▶ COMPLETED
//!      │                                                       ▲
//!      └──────────────────────complete()───────────────────────┘
//! ```
//!
//! Re-submitting a completed handover is a [`StateError`]; submissions are
//! never merged into a completed record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use occ_core::{HandoverId, LifecycleError, StateError, Timestamp, ValidationError};

use crate::non_blank;

/// Lifecycle state of a handover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandoverState {
    /// Created at move-out request; nothing recorded yet.
    NotStarted,
    /// A draft has been saved.
    InProgress,
    /// Submitted. Immutable from here on.
    Completed,
}

impl std::fmt::Display for HandoverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        })
    }
}

/// A returnable item class: whether it came back and how many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedItem {
    /// Whether the item was returned.
    #[serde(default)]
    pub returned: bool,
    /// How many were returned, when counted.
    #[serde(default)]
    pub count: Option<u32>,
}

impl ReturnedItem {
    /// Returned, with a count.
    pub fn returned(count: u32) -> Self {
        Self {
            returned: true,
            count: Some(count),
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        match self.count {
            Some(n) if n > 0 && !self.returned => Err(ValidationError::invalid(
                field,
                format!("count {n} given for an item not marked returned"),
            )),
            _ => Ok(()),
        }
    }
}

/// Form input for a handover, used for both drafts and submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverFields {
    #[serde(default)]
    pub keys: ReturnedItem,
    #[serde(default)]
    pub accessories: ReturnedItem,
    #[serde(default)]
    pub access_card: ReturnedItem,
    #[serde(default)]
    pub parking_card: ReturnedItem,
    #[serde(default)]
    pub handover_date: Option<NaiveDate>,
    #[serde(default)]
    pub handover_to_person: Option<String>,
    #[serde(default)]
    pub handover_to_contact: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl HandoverFields {
    fn validate_items(&self) -> Result<(), ValidationError> {
        self.keys.validate("keys")?;
        self.accessories.validate("accessories")?;
        self.access_card.validate("access_card")?;
        self.parking_card.validate("parking_card")?;
        Ok(())
    }
}

/// The handover record of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverInfo {
    pub id: HandoverId,
    pub state: HandoverState,
    pub keys: ReturnedItem,
    pub accessories: ReturnedItem,
    pub access_card: ReturnedItem,
    pub parking_card: ReturnedItem,
    pub handover_date: Option<NaiveDate>,
    pub handover_to_person: Option<String>,
    pub handover_to_contact: Option<String>,
    pub remarks: Option<String>,
    pub completed_at: Option<Timestamp>,
}

impl HandoverInfo {
    /// A blank handover in `NOT_STARTED`.
    pub fn new(id: HandoverId) -> Self {
        Self {
            id,
            state: HandoverState::NotStarted,
            keys: ReturnedItem::default(),
            accessories: ReturnedItem::default(),
            access_card: ReturnedItem::default(),
            parking_card: ReturnedItem::default(),
            handover_date: None,
            handover_to_person: None,
            handover_to_contact: None,
            remarks: None,
            completed_at: None,
        }
    }

    /// Whether the handover has been submitted.
    pub fn is_completed(&self) -> bool {
        self.state == HandoverState::Completed
    }

    /// Save partial input without submitting.
    pub fn save_draft(
        &mut self,
        id: HandoverId,
        fields: HandoverFields,
    ) -> Result<(), LifecycleError> {
        self.require_open(id, "save handover draft")?;
        fields.validate_items()?;
        self.apply(fields);
        self.state = HandoverState::InProgress;
        Ok(())
    }

    /// Submit the handover.
    ///
    /// # Errors
    ///
    /// - [`StateError`] if `id` is not this handover or it is already
    ///   completed.
    /// - [`ValidationError`] if `handover_date` or `handover_to_person` is
    ///   blank, or an item count contradicts its returned flag.
    pub fn complete(
        &mut self,
        id: HandoverId,
        fields: HandoverFields,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        self.require_open(id, "complete handover")?;
        if fields.handover_date.is_none() {
            return Err(ValidationError::missing("handover_date").into());
        }
        if non_blank(fields.handover_to_person.clone()).is_none() {
            return Err(ValidationError::missing("handover_to_person").into());
        }
        fields.validate_items()?;

        self.apply(fields);
        self.state = HandoverState::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    fn require_open(&self, id: HandoverId, operation: &str) -> Result<(), StateError> {
        if id != self.id {
            return Err(StateError::new(
                operation,
                self.state,
                format!("{id} is not the active handover ({})", self.id),
            ));
        }
        if self.is_completed() {
            return Err(StateError::new(
                operation,
                self.state,
                "handover was already submitted",
            ));
        }
        Ok(())
    }

    fn apply(&mut self, fields: HandoverFields) {
        self.keys = fields.keys;
        self.accessories = fields.accessories;
        self.access_card = fields.access_card;
        self.parking_card = fields.parking_card;
        self.handover_date = fields.handover_date;
        self.handover_to_person = non_blank(fields.handover_to_person);
        self.handover_to_contact = non_blank(fields.handover_to_contact);
        self.remarks = non_blank(fields.remarks);
    }
}

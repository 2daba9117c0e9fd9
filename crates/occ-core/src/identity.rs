//! # Identity Newtypes
//!
//! Stage records are keyed by random UUIDs minted by the orchestrator.
//! Spaces and users are keyed by externally assigned strings (unit numbers,
//! directory user ids), validated for non-emptiness at construction and on
//! deserialization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a handover record (one per exit).
    HandoverId,
    "handover"
);
uuid_id!(
    /// Identifier of an inspection record.
    InspectionId,
    "inspection"
);
uuid_id!(
    /// Identifier of a maintenance record.
    MaintenanceId,
    "maintenance"
);
uuid_id!(
    /// Identifier of a settlement record.
    SettlementId,
    "settlement"
);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create the identifier, trimming whitespace.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::MissingField`] for an empty or
            /// whitespace-only value.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::missing($field));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a leasable physical space (unit, shop, parking bay).
    SpaceId,
    "space_id"
);
string_id!(
    /// Identifier of a staff user, resolved to a display name by the
    /// directory collaborator.
    UserId,
    "user_id"
);

//! Identity types for backlog records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour of the strongly-typed record identifiers.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display {
    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// The underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh UUIDv7 identifier (timestamp-sortable).
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh UUIDv7 identifier.
            pub fn now_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// The underlying UUID.
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl EntityIdType for $name {
            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a weighting dimension.
    DimensionId
);
define_entity_id!(
    /// Identifier of an epic.
    EpicId
);
define_entity_id!(
    /// Identifier of a story (child of an epic).
    StoryId
);
define_entity_id!(
    /// Identifier of a standalone task.
    TaskId
);

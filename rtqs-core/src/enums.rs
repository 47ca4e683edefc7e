//! Enum types for backlog records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CORE ENUMS
// ============================================================================

/// Record collection discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Dimension,
    Epic,
    Story,
    Task,
    TaskScore,
}

/// The fixed symbolic dimension set for epics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RtqsDimension {
    R,
    T,
    Q,
    S,
}

impl RtqsDimension {
    /// All epic dimensions in canonical order.
    pub const ALL: [RtqsDimension; 4] = [
        RtqsDimension::R,
        RtqsDimension::T,
        RtqsDimension::Q,
        RtqsDimension::S,
    ];

    /// Canonical (upper-case) name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RtqsDimension::R => "R",
            RtqsDimension::T => "T",
            RtqsDimension::Q => "Q",
            RtqsDimension::S => "S",
        }
    }

    /// Parse a dimension name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "R" => Some(RtqsDimension::R),
            "T" => Some(RtqsDimension::T),
            "Q" => Some(RtqsDimension::Q),
            "S" => Some(RtqsDimension::S),
            _ => None,
        }
    }
}

impl fmt::Display for RtqsDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an epic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EpicStatus {
    /// Awaiting review; excluded from priority sorting until validated
    Proposed,
    /// Official, but missing a score or effort
    #[default]
    Unprioritized,
    /// Official, every score and the effort total are positive
    Prioritized,
}

impl EpicStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EpicStatus::Proposed => "proposed",
            EpicStatus::Unprioritized => "unprioritized",
            EpicStatus::Prioritized => "prioritized",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s.to_lowercase().as_str() {
            "proposed" => Ok(EpicStatus::Proposed),
            "unprioritized" => Ok(EpicStatus::Unprioritized),
            "prioritized" => Ok(EpicStatus::Prioritized),
            _ => Err(StatusParseError(s.to_string())),
        }
    }

    /// Official status implied by the prioritization predicate.
    pub fn from_predicate(prioritized: bool) -> Self {
        if prioritized {
            EpicStatus::Prioritized
        } else {
            EpicStatus::Unprioritized
        }
    }

    pub fn is_proposed(&self) -> bool {
        matches!(self, EpicStatus::Proposed)
    }
}

impl fmt::Display for EpicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for EpicStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Status of a story within its epic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    /// Counts toward the epic effort
    #[default]
    Official,
    /// Does not count until validated
    Proposed,
}

impl StoryStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            StoryStatus::Official => "official",
            StoryStatus::Proposed => "proposed",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s.to_lowercase().as_str() {
            "official" => Ok(StoryStatus::Official),
            "proposed" => Ok(StoryStatus::Proposed),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for StoryStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusParseError(pub String);

impl fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid status: {}", self.0)
    }
}

impl std::error::Error for StatusParseError {}

/// Direction of a "move up / move down" reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    /// Index of the neighbour in a list of `len` entries, if any.
    pub fn neighbour(&self, index: usize, len: usize) -> Option<usize> {
        match self {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down if index + 1 < len => Some(index + 1),
            MoveDirection::Down => None,
        }
    }
}

/// Which dimension names a registry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamePolicy {
    /// Only R, T, Q and S (case-insensitive, stored upper-case)
    #[default]
    Rtqs,
    /// Any non-empty name
    FreeForm,
}

impl FromStr for NamePolicy {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rtqs" => Ok(NamePolicy::Rtqs),
            "free_form" | "freeform" => Ok(NamePolicy::FreeForm),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

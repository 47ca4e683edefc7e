//! Validated numeric value types
//!
//! Every numeric form input goes through one of these constructors, so a
//! malformed or out-of-range number is rejected before it can become a
//! pending edit.

use crate::{RtqsResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn parse_integer(field: &str, input: &str) -> Result<i64, ValidationError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::MalformedNumber {
            field: field.to_string(),
            input: input.to_string(),
        })
}

/// Epic dimension score in `0..=10`; `0` means unset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const UNSET: Score = Score(0);
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> RtqsResult<Self> {
        if value > Self::MAX {
            return Err(ValidationError::InvalidValue {
                field: "score".to_string(),
                reason: format!("score must be between 0 and {}, got {}", Self::MAX, value),
            }
            .into());
        }
        Ok(Score(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<u8> for Score {
    type Error = crate::RtqsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl FromStr for Score {
    type Err = crate::RtqsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_integer("score", s)?;
        let value = u8::try_from(value).map_err(|_| ValidationError::InvalidValue {
            field: "score".to_string(),
            reason: format!("score must be between 0 and {}, got {}", Score::MAX, value),
        })?;
        Score::new(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point estimate from the Fibonacci-like scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct StoryPoints(u32);

impl StoryPoints {
    pub const ALLOWED: [u32; 7] = [1, 2, 3, 5, 8, 13, 21];
    pub const ONE: StoryPoints = StoryPoints(1);

    pub fn new(value: u32) -> RtqsResult<Self> {
        if !Self::ALLOWED.contains(&value) {
            return Err(ValidationError::InvalidValue {
                field: "story_points".to_string(),
                reason: format!("{} is not one of {:?}", value, Self::ALLOWED),
            }
            .into());
        }
        Ok(StoryPoints(value))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for StoryPoints {
    fn default() -> Self {
        StoryPoints::ONE
    }
}

impl TryFrom<u32> for StoryPoints {
    type Error = crate::RtqsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        StoryPoints::new(value)
    }
}

impl From<StoryPoints> for u32 {
    fn from(points: StoryPoints) -> u32 {
        points.0
    }
}

impl FromStr for StoryPoints {
    type Err = crate::RtqsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_integer("story_points", s)?;
        let value = u32::try_from(value).map_err(|_| ValidationError::InvalidValue {
            field: "story_points".to_string(),
            reason: format!("{} is not one of {:?}", value, StoryPoints::ALLOWED),
        })?;
        StoryPoints::new(value)
    }
}

impl fmt::Display for StoryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task dimension score from the small discrete set `{0, 1, 3, 5}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskScoreLevel {
    #[default]
    Unset,
    Low,
    Medium,
    High,
}

impl TaskScoreLevel {
    pub fn get(&self) -> u8 {
        match self {
            TaskScoreLevel::Unset => 0,
            TaskScoreLevel::Low => 1,
            TaskScoreLevel::Medium => 3,
            TaskScoreLevel::High => 5,
        }
    }

    pub fn new(value: u8) -> RtqsResult<Self> {
        match value {
            0 => Ok(TaskScoreLevel::Unset),
            1 => Ok(TaskScoreLevel::Low),
            3 => Ok(TaskScoreLevel::Medium),
            5 => Ok(TaskScoreLevel::High),
            other => Err(ValidationError::InvalidValue {
                field: "task_score".to_string(),
                reason: format!("{} is not one of [0, 1, 3, 5]", other),
            }
            .into()),
        }
    }
}

impl TryFrom<u8> for TaskScoreLevel {
    type Error = crate::RtqsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TaskScoreLevel::new(value)
    }
}

impl From<TaskScoreLevel> for u8 {
    fn from(level: TaskScoreLevel) -> u8 {
        level.get()
    }
}

impl FromStr for TaskScoreLevel {
    type Err = crate::RtqsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_integer("task_score", s)?;
        let value = u8::try_from(value).map_err(|_| ValidationError::InvalidValue {
            field: "task_score".to_string(),
            reason: format!("{} is not one of [0, 1, 3, 5]", value),
        })?;
        TaskScoreLevel::new(value)
    }
}

impl fmt::Display for TaskScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Parse a coefficient typed into a form. Must be a finite real number.
pub fn parse_coefficient(input: &str) -> RtqsResult<f64> {
    let value = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::MalformedNumber {
            field: "coefficient".to_string(),
            input: input.to_string(),
        })?;
    check_coefficient(value)?;
    Ok(value)
}

/// Reject NaN and infinite coefficients.
pub fn check_coefficient(value: f64) -> RtqsResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: "coefficient".to_string(),
            reason: format!("coefficient must be finite, got {}", value),
        }
        .into());
    }
    Ok(())
}

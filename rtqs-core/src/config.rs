//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};

/// Bucket definitions used by the analytics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub priority_buckets: Vec<BucketDef>,
    pub value_buckets: Vec<BucketDef>,
    pub story_position_buckets: Vec<BucketDef>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            priority_buckets: vec![
                BucketDef::new("0-1", 0.0, 1.0),
                BucketDef::new("1-2", 1.0, 2.0),
                BucketDef::new("2-3", 2.0, 3.0),
                BucketDef::new("3-5", 3.0, 5.0),
                BucketDef::unbounded("5+", 5.0),
            ],
            value_buckets: vec![
                BucketDef::new("0-10", 0.0, 10.0),
                BucketDef::new("10-20", 10.0, 20.0),
                BucketDef::new("20-30", 20.0, 30.0),
                BucketDef::new("30-35", 30.0, 35.0),
                BucketDef::new("35-40", 35.0, 40.0),
                BucketDef::unbounded("40+", 40.0),
            ],
            story_position_buckets: vec![
                BucketDef::new("1st", 0.0, 1.0),
                BucketDef::new("2nd", 1.0, 2.0),
                BucketDef::new("3rd", 2.0, 3.0),
                BucketDef::unbounded("4th+", 3.0),
            ],
        }
    }
}

/// Master configuration struct for a dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub analytics: AnalyticsConfig,
    /// Absolute tolerance when cross-checking store views against the engine
    pub view_tolerance: f64,
    /// Dimension names accepted when the registry serves epics
    pub epic_name_policy: NamePolicy,
    /// Dimension names accepted when the registry serves tasks
    pub task_name_policy: NamePolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            view_tolerance: 1e-9,
            epic_name_policy: NamePolicy::Rtqs,
            task_name_policy: NamePolicy::FreeForm,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(input: &str) -> RtqsResult<Self> {
        let config: DashboardConfig = toml::from_str(input).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden from environment variables, then validated.
    ///
    /// Environment variables:
    /// - `RTQS_VIEW_TOLERANCE`: view cross-check tolerance (default: 1e-9)
    /// - `RTQS_TASK_NAME_POLICY`: `rtqs` or `free_form` (default: free_form)
    pub fn from_env() -> RtqsResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("RTQS_VIEW_TOLERANCE") {
            config.view_tolerance = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "view_tolerance".to_string(),
                value: raw.clone(),
                reason: "must be a number".to_string(),
            })?;
        }
        if let Ok(raw) = std::env::var("RTQS_TASK_NAME_POLICY") {
            config.task_name_policy = raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "task_name_policy".to_string(),
                value: raw.clone(),
                reason: "must be 'rtqs' or 'free_form'".to_string(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - view_tolerance is finite and non-negative
    /// - every bucket list forms an ascending contiguous partition
    pub fn validate(&self) -> RtqsResult<()> {
        if !self.view_tolerance.is_finite() || self.view_tolerance < 0.0 {
            return Err(RtqsError::Config(ConfigError::InvalidValue {
                field: "view_tolerance".to_string(),
                value: self.view_tolerance.to_string(),
                reason: "view_tolerance must be finite and non-negative".to_string(),
            }));
        }

        let lists = [
            ("analytics.priority_buckets", &self.analytics.priority_buckets),
            ("analytics.value_buckets", &self.analytics.value_buckets),
            (
                "analytics.story_position_buckets",
                &self.analytics.story_position_buckets,
            ),
        ];
        for (field, defs) in lists {
            BucketSet::new(defs.clone()).map_err(|e| {
                let reason = match e {
                    RtqsError::Validation(inner) => inner.to_string(),
                    other => other.to_string(),
                };
                RtqsError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{} buckets", defs.len()),
                    reason,
                })
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

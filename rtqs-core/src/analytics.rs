//! Aggregate series over the authoritative epic views and stories.
//!
//! Every series is computed from confirmed rows only. Buckets that end up
//! with no members are left out of the series.

use crate::{
    epic_view_is_prioritized, AnalyticsConfig, BucketSet, EpicPriorityView, RtqsDimension,
    RtqsResult, Story,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Priority bucket with the summed value of its epics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityValuePoint {
    pub name: String,
    pub total_value: f64,
    pub epic_count: usize,
}

/// Priority bucket with the summed effort of its epics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEffortPoint {
    pub name: String,
    pub total_effort: u32,
    pub epic_count: usize,
}

/// Story position bucket (by `order_index`) with point statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPositionPoint {
    pub name: String,
    pub avg_points: f64,
    pub total_points: u32,
    pub story_count: usize,
}

/// Value bucket with epic count and average points of those epics' stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRangePoint {
    pub name: String,
    pub epic_count: usize,
    pub avg_story_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub dimension: RtqsDimension,
    pub total: u32,
    pub average: f64,
}

/// Priority bucket with the mean of each dimension score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionPriorityPoint {
    pub name: String,
    pub avg_r: f64,
    pub avg_t: f64,
    pub avg_q: f64,
    pub avg_s: f64,
    pub epic_count: usize,
}

/// Priority bucket with the share of gate stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConcentrationPoint {
    pub name: String,
    pub gate_stories: usize,
    pub total_stories: usize,
    pub gate_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Epics satisfying the prioritization predicate.
    pub prioritized_epics: usize,
    pub priority_value: Vec<PriorityValuePoint>,
    pub priority_effort: Vec<PriorityEffortPoint>,
    pub story_position: Vec<StoryPositionPoint>,
    pub value_ranges: Vec<ValueRangePoint>,
    pub dimension_contribution: Vec<DimensionContribution>,
    pub dimension_by_priority: Vec<DimensionPriorityPoint>,
    pub gate_concentration: Vec<GateConcentrationPoint>,
}

impl AnalyticsReport {
    pub fn is_empty(&self) -> bool {
        self.prioritized_epics == 0
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn stories_of<'a>(epics: &[&EpicPriorityView], stories: &'a [Story]) -> Vec<&'a Story> {
    let ids: HashSet<_> = epics.iter().map(|v| v.epic.epic_id).collect();
    stories.iter().filter(|s| ids.contains(&s.epic_id)).collect()
}

fn mean_points(stories: &[&Story]) -> f64 {
    let total: u32 = stories.iter().map(|s| s.points.get()).sum();
    mean(f64::from(total), stories.len())
}

/// Build every analytics series.
///
/// `views` are authoritative epic views; `stories` are all stories of those
/// epics. Fails only when a bucket list in `config` is malformed.
pub fn analytics_report(
    views: &[EpicPriorityView],
    stories: &[Story],
    config: &AnalyticsConfig,
) -> RtqsResult<AnalyticsReport> {
    let priority_set = BucketSet::new(config.priority_buckets.clone())?;
    let value_set = BucketSet::new(config.value_buckets.clone())?;
    let position_set = BucketSet::new(config.story_position_buckets.clone())?;

    let prioritized: Vec<&EpicPriorityView> =
        views.iter().filter(|v| epic_view_is_prioritized(v)).collect();
    let fully_scored: Vec<&EpicPriorityView> =
        views.iter().filter(|v| v.epic.scores.all_set()).collect();

    let by_priority = priority_set.bucketize(prioritized.iter().copied(), |v| v.priority);

    let priority_value = by_priority
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| PriorityValuePoint {
            name: b.name().to_string(),
            total_value: b.items.iter().map(|v| v.value).sum(),
            epic_count: b.len(),
        })
        .collect();

    let priority_effort = by_priority
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| PriorityEffortPoint {
            name: b.name().to_string(),
            total_effort: b.items.iter().map(|v| v.total_effort).sum(),
            epic_count: b.len(),
        })
        .collect();

    let story_position = position_set
        .bucketize(stories, |s| f64::from(s.order_index))
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|b| {
            let total_points: u32 = b.items.iter().map(|s| s.points.get()).sum();
            StoryPositionPoint {
                name: b.name().to_string(),
                avg_points: mean(f64::from(total_points), b.len()),
                total_points,
                story_count: b.len(),
            }
        })
        .collect();

    let value_ranges = value_set
        .bucketize(fully_scored.iter().copied(), |v| v.value)
        .into_iter()
        .filter(|b| !b.is_empty())
        .map(|b| ValueRangePoint {
            name: b.name().to_string(),
            epic_count: b.len(),
            avg_story_points: mean_points(&stories_of(&b.items, stories)),
        })
        .collect();

    let dimension_contribution = RtqsDimension::ALL
        .iter()
        .map(|d| {
            let total: u32 = fully_scored
                .iter()
                .map(|v| u32::from(v.epic.scores.get(*d).get()))
                .sum();
            DimensionContribution {
                dimension: *d,
                total,
                average: mean(f64::from(total), fully_scored.len()),
            }
        })
        .collect();

    let dimension_by_priority = by_priority
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| {
            let avg = |d: RtqsDimension| {
                let total: u32 = b
                    .items
                    .iter()
                    .map(|v| u32::from(v.epic.scores.get(d).get()))
                    .sum();
                mean(f64::from(total), b.len())
            };
            DimensionPriorityPoint {
                name: b.name().to_string(),
                avg_r: avg(RtqsDimension::R),
                avg_t: avg(RtqsDimension::T),
                avg_q: avg(RtqsDimension::Q),
                avg_s: avg(RtqsDimension::S),
                epic_count: b.len(),
            }
        })
        .collect();

    let gate_concentration = by_priority
        .iter()
        .filter_map(|b| {
            let bucket_stories = stories_of(&b.items, stories);
            if bucket_stories.is_empty() {
                return None;
            }
            let gate_stories = bucket_stories.iter().filter(|s| s.gate).count();
            Some(GateConcentrationPoint {
                name: b.name().to_string(),
                gate_stories,
                total_stories: bucket_stories.len(),
                gate_percent: mean(gate_stories as f64 * 100.0, bucket_stories.len()),
            })
        })
        .collect();

    Ok(AnalyticsReport {
        prioritized_epics: prioritized.len(),
        priority_value,
        priority_effort,
        story_position,
        value_ranges,
        dimension_contribution,
        dimension_by_priority,
        gate_concentration,
    })
}

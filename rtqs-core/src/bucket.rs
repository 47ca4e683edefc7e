//! Half-open interval buckets for aggregate reporting

use crate::{RtqsResult, ValidationError};
use serde::{Deserialize, Serialize};

/// One interval `[min, max)`. An absent `max` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDef {
    pub name: String,
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl BucketDef {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max: Some(max),
        }
    }

    pub fn unbounded(name: impl Into<String>, min: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max: None,
        }
    }

    /// Whether `metric` lies in `[min, max)`. NaN is never contained.
    pub fn contains(&self, metric: f64) -> bool {
        metric >= self.min && self.max.map_or(true, |max| metric < max)
    }
}

/// A group of items that fell into one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a, T> {
    pub def: &'a BucketDef,
    pub items: Vec<&'a T>,
}

impl<T> Bucket<'_, T> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// An ascending, contiguous partition of half-open intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSet {
    defs: Vec<BucketDef>,
}

impl BucketSet {
    /// Validate and wrap bucket definitions.
    ///
    /// Each bucket must start where the previous one ended, only the last
    /// bucket may be unbounded, and every bounded bucket must be non-empty.
    pub fn new(defs: Vec<BucketDef>) -> RtqsResult<Self> {
        let invalid = |reason: String| ValidationError::InvalidBuckets { reason };

        if defs.is_empty() {
            return Err(invalid("at least one bucket is required".to_string()).into());
        }
        for (i, def) in defs.iter().enumerate() {
            if !def.min.is_finite() {
                return Err(invalid(format!("bucket '{}' has a non-finite min", def.name)).into());
            }
            match def.max {
                Some(max) if !(max > def.min) || !max.is_finite() => {
                    return Err(invalid(format!(
                        "bucket '{}' must satisfy min < max < infinity",
                        def.name
                    ))
                    .into());
                }
                None if i + 1 != defs.len() => {
                    return Err(
                        invalid(format!("only the last bucket may be unbounded, not '{}'", def.name))
                            .into(),
                    );
                }
                _ => {}
            }
            if let Some(next) = defs.get(i + 1) {
                if def.max != Some(next.min) {
                    return Err(invalid(format!(
                        "bucket '{}' must end where '{}' starts",
                        def.name, next.name
                    ))
                    .into());
                }
            }
        }
        Ok(Self { defs })
    }

    pub fn defs(&self) -> &[BucketDef] {
        &self.defs
    }

    /// Index of the first bucket containing `metric`. A value equal to a
    /// boundary belongs to the bucket that starts there.
    pub fn index_of(&self, metric: f64) -> Option<usize> {
        self.defs.iter().position(|d| d.contains(metric))
    }

    /// Group items by `metric`. Every bucket is returned, including empty
    /// ones; items below the first bucket are dropped.
    pub fn bucketize<'a, T, F>(&'a self, items: impl IntoIterator<Item = &'a T>, metric: F) -> Vec<Bucket<'a, T>>
    where
        F: Fn(&T) -> f64,
    {
        let mut buckets: Vec<Bucket<'a, T>> = self
            .defs
            .iter()
            .map(|def| Bucket {
                def,
                items: Vec::new(),
            })
            .collect();
        for item in items {
            if let Some(i) = self.index_of(metric(item)) {
                buckets[i].items.push(item);
            }
        }
        buckets
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Integer boundaries always land in the bucket that starts there.
        #[test]
        fn prop_boundary_goes_to_upper_bucket(n in 1usize..20, k in 0usize..19) {
            prop_assume!(k < n);
            let mut defs: Vec<BucketDef> = (0..n)
                .map(|i| BucketDef::new(format!("{}", i), i as f64, i as f64 + 1.0))
                .collect();
            defs.push(BucketDef::unbounded("tail", n as f64));
            let set = BucketSet::new(defs).unwrap();
            prop_assert_eq!(set.index_of(k as f64), Some(k));
        }

        /// Every non-negative metric lands in exactly one bucket of a partition starting at 0.
        #[test]
        fn prop_partition_is_total_above_min(metric in 0.0f64..1.0e9) {
            let set = BucketSet::new(vec![
                BucketDef::new("a", 0.0, 1.0),
                BucketDef::new("b", 1.0, 2.0),
                BucketDef::unbounded("c", 2.0),
            ]).unwrap();
            let hits = set.defs().iter().filter(|d| d.contains(metric)).count();
            prop_assert_eq!(hits, 1);
        }
    }
}

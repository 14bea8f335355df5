//! Threshold-based time-series accumulation.
//!
//! Contributions at or above the threshold become checkpoints on their own.
//! Smaller ones pile up per key until the bucket reaches the threshold, which
//! flushes that bucket alone. Whatever is left is flushed once at the end.

use chrono::{DateTime, Utc};
use log::debug;
use std::collections::BTreeMap;

use crate::models::TimeseriesPoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution<K> {
    pub timestamp: DateTime<Utc>,
    pub key: K,
    pub power: f64,
}

/// Power released at one instant, per key.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<K> {
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<K, f64>,
}

#[derive(Debug, Clone)]
pub struct Accumulator<K> {
    threshold: f64,
    pending: BTreeMap<K, f64>,
    last_seen: Option<DateTime<Utc>>,
}

impl<K: Ord + Copy> Accumulator<K> {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            pending: BTreeMap::new(),
            last_seen: None,
        }
    }

    /// Feeds one contribution. Contributions must arrive in timestamp order.
    pub fn push(&mut self, timestamp: DateTime<Utc>, key: K, power: f64) -> Option<Checkpoint<K>> {
        self.last_seen = Some(timestamp);

        if power >= self.threshold {
            return Some(Checkpoint {
                timestamp,
                values: BTreeMap::from([(key, power)]),
            });
        }

        let bucket = self.pending.entry(key).or_insert(0.0);
        *bucket += power;
        if *bucket >= self.threshold {
            let released = *bucket;
            self.pending.remove(&key);
            return Some(Checkpoint {
                timestamp,
                values: BTreeMap::from([(key, released)]),
            });
        }
        None
    }

    /// Flushes every non-empty bucket as one checkpoint at the last seen timestamp.
    pub fn finish(self) -> Option<Checkpoint<K>> {
        let timestamp = self.last_seen?;
        let values: BTreeMap<K, f64> = self
            .pending
            .into_iter()
            .filter(|(_, power)| *power > 0.0)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(Checkpoint { timestamp, values })
        }
    }
}

pub fn accumulate<K, I>(threshold: f64, contributions: I) -> Vec<Checkpoint<K>>
where
    K: Ord + Copy,
    I: IntoIterator<Item = Contribution<K>>,
{
    let mut accumulator = Accumulator::new(threshold);
    let mut checkpoints: Vec<Checkpoint<K>> = contributions
        .into_iter()
        .filter_map(|c| accumulator.push(c.timestamp, c.key, c.power))
        .collect();
    checkpoints.extend(accumulator.finish());
    checkpoints
}

/// Per-choice time series with cumulative values for every choice at each point.
pub fn choice_series<I>(threshold: f64, choice_count: usize, contributions: I) -> Vec<TimeseriesPoint>
where
    I: IntoIterator<Item = Contribution<usize>>,
{
    let checkpoints = accumulate(threshold, contributions);
    debug!("Time series reduced to {} checkpoints", checkpoints.len());

    let mut running: BTreeMap<i64, f64> = (0..choice_count).map(|i| (i as i64, 0.0)).collect();
    checkpoints
        .into_iter()
        .map(|checkpoint| {
            for (choice, power) in checkpoint.values {
                *running.entry(choice as i64).or_insert(0.0) += power;
            }
            TimeseriesPoint {
                timestamp: checkpoint.timestamp,
                values: running.clone(),
                winning_threshold: None,
            }
        })
        .collect()
}

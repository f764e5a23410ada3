//! Metric time series
//!
//! One bounded-by-age series per metric name, kept in a [`DashMap`] so the
//! collector can append while summaries are read.

use crate::models::MetricSample;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Samples older than this are dropped by the collector
pub const METRIC_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub period_hours: u32,
    pub metrics: BTreeMap<String, MetricStats>,
    pub total_datapoints: usize,
}

#[derive(Debug, Default)]
pub struct MetricStore {
    series: DashMap<String, VecDeque<MetricPoint>>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, value: f64, timestamp: DateTime<Utc>) {
        self.series
            .entry(name.to_string())
            .or_default()
            .push_back(MetricPoint { timestamp, value });
    }

    /// Store the collected subset of a sample
    pub fn record_sample(&self, sample: &MetricSample, timestamp: DateTime<Utc>) {
        self.record("cpu_usage", sample.cpu_usage, timestamp);
        self.record("memory_usage", sample.memory_usage, timestamp);
        self.record("disk_usage", sample.disk_usage, timestamp);
        self.record("response_time", sample.response_time, timestamp);
        self.record("error_rate", sample.error_rate, timestamp);
    }

    /// Drop points older than the retention window
    pub fn prune(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(METRIC_RETENTION_HOURS);
        for mut entry in self.series.iter_mut() {
            let series = entry.value_mut();
            while series.front().map(|p| p.timestamp <= cutoff).unwrap_or(false) {
                series.pop_front();
            }
        }
        self.series.retain(|_, series| !series.is_empty());
    }

    /// Total stored points across all series
    pub fn len(&self) -> usize {
        self.series.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics over the last `hours`, capped at the retention window
    pub fn summary(&self, hours: u32, now: DateTime<Utc>) -> MetricsSummary {
        let hours = hours.min(METRIC_RETENTION_HOURS as u32);
        let cutoff = now - Duration::hours(i64::from(hours));
        let mut metrics = BTreeMap::new();
        let mut total_datapoints = 0;

        for entry in self.series.iter() {
            let values: Vec<f64> = entry
                .value()
                .iter()
                .filter(|p| p.timestamp > cutoff)
                .map(|p| p.value)
                .collect();
            if values.is_empty() {
                continue;
            }

            let sum: f64 = values.iter().sum();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            total_datapoints += values.len();

            metrics.insert(
                entry.key().clone(),
                MetricStats {
                    avg: round2(sum / values.len() as f64),
                    min: round2(min),
                    max: round2(max),
                    count: values.len(),
                },
            );
        }

        MetricsSummary {
            period_hours: hours,
            metrics,
            total_datapoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_over_window() {
        let store = MetricStore::new();
        let now = Utc::now();
        store.record("cpu_usage", 10.0, now - Duration::hours(3));
        store.record("cpu_usage", 40.0, now - Duration::minutes(30));
        store.record("cpu_usage", 60.0, now);
        store.record("error_rate", 1.234, now);

        let summary = store.summary(1, now);
        assert_eq!(summary.total_datapoints, 3);
        let cpu = &summary.metrics["cpu_usage"];
        assert_eq!(cpu.avg, 50.0);
        assert_eq!(cpu.min, 40.0);
        assert_eq!(cpu.max, 60.0);
        assert_eq!(cpu.count, 2);
        assert_eq!(summary.metrics["error_rate"].avg, 1.23);
    }

    #[test]
    fn test_prune_drops_points_past_retention() {
        let store = MetricStore::new();
        let now = Utc::now();
        store.record("cpu_usage", 10.0, now - Duration::hours(25));
        store.record("disk_usage", 30.0, now - Duration::hours(26));
        store.record("cpu_usage", 20.0, now);
        assert_eq!(store.len(), 3);

        store.prune(now);
        assert_eq!(store.len(), 1);
        assert!(store.summary(24, now).metrics.get("disk_usage").is_none());
    }

    #[test]
    fn test_summary_window_capped_at_retention() {
        let store = MetricStore::new();
        let now = Utc::now();
        store.record("cpu_usage", 40.0, now - Duration::hours(2));

        let summary = store.summary(u32::MAX, now);
        assert_eq!(summary.period_hours, METRIC_RETENTION_HOURS as u32);
        assert_eq!(summary.metrics["cpu_usage"].count, 1);
    }

    #[test]
    fn test_record_sample_tracks_five_series() {
        let store = MetricStore::new();
        store.record_sample(&MetricSample::default(), Utc::now());
        assert_eq!(store.len(), 5);
    }
}

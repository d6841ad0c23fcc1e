//! Bounded in-memory history with JSON file persistence.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::models::*;

/// Most recent records kept in memory.
pub const HISTORY_CAPACITY: usize = 1000;

/// The history is written to disk after this many appends.
pub const FLUSH_EVERY: usize = 10;

/// Window used for uptime and latency-variance calculations.
pub const RECENT_WINDOW: usize = 100;

/// History persistence error types.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ring buffer of [`HealthRecord`]s, oldest first.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    records: VecDeque<HealthRecord>,
    appends: usize,
}

impl HistoryStore {
    /// A history that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: VecDeque::with_capacity(HISTORY_CAPACITY),
            appends: 0,
        }
    }

    /// Open the history backed by `path`, loading what is already there.
    ///
    /// Loading is best-effort: a missing or malformed file leaves the
    /// history empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };

        if !path.exists() {
            tracing::debug!("No history file at {}", path.display());
            return store;
        }

        match Self::load_from(&path) {
            Ok(records) => {
                tracing::info!("History loaded: {} records", records.len());
                store.extend(records);
            }
            Err(e) => {
                tracing::warn!("Could not load history from {}: {}", path.display(), e);
            }
        }
        store
    }

    /// Read records from a history file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Vec<HealthRecord>, HistoryError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write all records to the backing file.
    pub fn save(&self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let records: Vec<&HealthRecord> = self.records.iter().collect();
        let content = serde_json::to_string_pretty(&records)?;
        fs::write(path, content)?;
        tracing::debug!("History saved: {} records", self.records.len());
        Ok(())
    }

    /// Append a record, evicting the oldest beyond capacity, and flush to
    /// disk on every tenth append.
    pub fn append(&mut self, record: HealthRecord) {
        self.push(record);
        self.appends += 1;

        if self.appends % FLUSH_EVERY == 0 {
            if let Err(e) = self.save() {
                tracing::error!("Failed to save history: {}", e);
            }
        }
    }

    fn push(&mut self, record: HealthRecord) {
        if self.records.len() == HISTORY_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    fn extend(&mut self, records: Vec<HealthRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &HealthRecord> {
        self.records.iter()
    }

    /// The last `count` records, oldest first.
    pub fn recent(&self, count: usize) -> Vec<HealthRecord> {
        let skip = self.records.len().saturating_sub(count);
        self.records.iter().skip(skip).cloned().collect()
    }

    fn recent_iter(&self, count: usize) -> impl Iterator<Item = &HealthRecord> {
        let skip = self.records.len().saturating_sub(count);
        self.records.iter().skip(skip)
    }

    /// Percentage of connected records among the last [`RECENT_WINDOW`],
    /// or `None` when the history is empty.
    pub fn recent_uptime_pct(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let window: Vec<&HealthRecord> = self.recent_iter(RECENT_WINDOW).collect();
        let connected = window.iter().filter(|r| r.connected).count();
        Some(connected as f64 / window.len() as f64 * 100.0)
    }

    /// Latencies recorded among the last [`RECENT_WINDOW`] records.
    pub fn recent_latencies(&self) -> Vec<f64> {
        self.recent_iter(RECENT_WINDOW)
            .filter_map(|r| r.latency)
            .filter(|ms| *ms > 0.0)
            .collect()
    }

    /// Statistics over the whole history, `None` when it is empty.
    pub fn statistics(&self) -> Option<HistoryStatistics> {
        if self.records.is_empty() {
            return None;
        }

        let total = self.records.len();
        let latencies: Vec<f64> = self.records.iter().filter_map(|r| r.latency).collect();
        let successful = latencies.len();

        let mut stats = HistoryStatistics {
            total_tests: total,
            successful_tests: successful,
            success_rate: round2(successful as f64 / total as f64 * 100.0),
            avg_latency: None,
            min_latency: None,
            max_latency: None,
        };

        if successful > 0 {
            let sum: f64 = latencies.iter().sum();
            let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
            let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            stats.avg_latency = Some(round2(sum / successful as f64));
            stats.min_latency = Some(round2(min));
            stats.max_latency = Some(round2(max));
        }

        Some(stats)
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use tempfile::tempdir;

    fn record(i: i64, latency: Option<f64>) -> HealthRecord {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::seconds(i);
        HealthRecord::new(ts, latency, 90)
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut store = HistoryStore::in_memory();
        for i in 0..1050 {
            store.append(record(i, Some(i as f64)));
        }

        assert_eq!(store.len(), HISTORY_CAPACITY);
        let first = store.records().next().unwrap();
        assert_eq!(first.latency, Some(50.0));
        let last = store.records().last().unwrap();
        assert_eq!(last.latency, Some(1049.0));
    }

    #[test]
    fn test_round_trip_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");

        let mut store = HistoryStore::open(&path);
        store.append(record(0, Some(12.34)));
        store.append(record(1, None));
        store.append(HealthRecord::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 2).unwrap()
                + ChronoDuration::nanoseconds(123_456_789),
            Some(0.1 + 0.2),
            47,
        ));
        store.save().unwrap();

        let reloaded = HistoryStore::open(&path);
        let before: Vec<_> = store.records().cloned().collect();
        let after: Vec<_> = reloaded.records().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_flush_every_tenth_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");
        let mut store = HistoryStore::open(&path);

        for i in 0..9 {
            store.append(record(i, Some(10.0)));
        }
        assert!(!path.exists());

        store.append(record(9, Some(10.0)));
        assert_eq!(HistoryStore::load_from(&path).unwrap().len(), 10);

        for i in 10..15 {
            store.append(record(i, Some(10.0)));
        }
        assert_eq!(HistoryStore::load_from(&path).unwrap().len(), 10);
    }

    #[test]
    fn test_file_uses_two_space_indent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");
        let mut store = HistoryStore::open(&path);
        store.append(record(0, Some(5.0)));
        store.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {\n    \"timestamp\""));
    }

    #[test]
    fn test_malformed_file_yields_empty_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");
        fs::write(&path, "{ not json").unwrap();

        let store = HistoryStore::open(&path);
        assert!(store.is_empty());
        assert!(matches!(
            HistoryStore::load_from(&path),
            Err(HistoryError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_empty_history() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("absent.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_loads_legacy_history_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");
        fs::write(
            &path,
            r#"[
  {
    "timestamp": "2025-10-29T14:03:12.123456",
    "latency": 18.2,
    "connected": true,
    "score": 92,
    "category": "Excelente"
  },
  {
    "timestamp": "2025-10-29T14:03:42.654321",
    "latency": 64.0,
    "connected": true,
    "score": 71,
    "category": "Bom"
  },
  {
    "timestamp": "2025-10-29T14:04:12.000001",
    "latency": 140.5,
    "connected": true,
    "score": 48,
    "category": "Regular"
  },
  {
    "timestamp": "2025-10-29T14:04:42.500000",
    "latency": null,
    "connected": false,
    "score": 0,
    "category": "Ruim"
  }
]"#,
        )
        .unwrap();

        let store = HistoryStore::open(&path);
        assert_eq!(store.len(), 4);
        let categories: Vec<_> = store.records().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                HealthCategory::Excellent,
                HealthCategory::Good,
                HealthCategory::Fair,
                HealthCategory::Poor,
            ]
        );
        assert_eq!(store.recent(4)[0].latency, Some(18.2));
        assert_eq!(store.recent(1)[0].latency, None);
    }

    #[test]
    fn test_oversized_file_is_trimmed_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health_history.json");
        let records: Vec<HealthRecord> = (0..1200).map(|i| record(i, Some(1.0))).collect();
        fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let store = HistoryStore::open(&path);
        assert_eq!(store.len(), HISTORY_CAPACITY);
        assert_eq!(store.records().next().unwrap().timestamp, records[200].timestamp);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut store = HistoryStore::in_memory();
        for i in 0..5 {
            store.append(record(i, Some(i as f64)));
        }
        let recent: Vec<_> = store.recent(2).into_iter().map(|r| r.latency).collect();
        assert_eq!(recent, vec![Some(3.0), Some(4.0)]);
        assert_eq!(store.recent(30).len(), 5);
    }

    #[test]
    fn test_recent_uptime_uses_last_hundred() {
        let mut store = HistoryStore::in_memory();
        assert_eq!(store.recent_uptime_pct(), None);

        for i in 0..50 {
            store.append(record(i, None));
        }
        for i in 50..150 {
            store.append(record(i, Some(10.0)));
        }
        assert_eq!(store.recent_uptime_pct(), Some(100.0));

        for i in 150..160 {
            store.append(record(i, None));
        }
        assert_eq!(store.recent_uptime_pct(), Some(90.0));
    }

    #[test]
    fn test_statistics() {
        let mut store = HistoryStore::in_memory();
        assert!(store.statistics().is_none());

        store.append(record(0, None));
        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_tests, 1);
        assert_eq!(stats.successful_tests, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.avg_latency.is_none());

        store.append(record(1, Some(10.0)));
        store.append(record(2, Some(20.004)));
        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_tests, 3);
        assert_eq!(stats.successful_tests, 2);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(stats.avg_latency, Some(15.0));
        assert_eq!(stats.min_latency, Some(10.0));
        assert_eq!(stats.max_latency, Some(20.0));
    }
}

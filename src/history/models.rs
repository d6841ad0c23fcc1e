//! History model types.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health category derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCategory {
    #[serde(alias = "Excelente")]
    Excellent,
    #[serde(alias = "Bom")]
    Good,
    #[serde(alias = "Regular")]
    Fair,
    #[serde(alias = "Ruim")]
    Poor,
    /// Only produced when a scoring burst had no successful probe.
    #[serde(alias = "Desconectado")]
    Disconnected,
}

impl HealthCategory {
    /// Map a score to its category. Boundaries belong to the higher tier.
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => HealthCategory::Excellent,
            60..=79 => HealthCategory::Good,
            40..=59 => HealthCategory::Fair,
            _ => HealthCategory::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCategory::Excellent => "Excellent",
            HealthCategory::Good => "Good",
            HealthCategory::Fair => "Fair",
            HealthCategory::Poor => "Poor",
            HealthCategory::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored sample kept in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds, `null` when the probe failed
    pub latency: Option<f64>,
    pub connected: bool,
    pub score: u8,
    pub category: HealthCategory,
}

impl HealthRecord {
    pub fn new(timestamp: DateTime<Utc>, latency: Option<f64>, score: u8) -> Self {
        Self {
            timestamp,
            latency,
            connected: latency.is_some(),
            score,
            category: HealthCategory::from_score(score),
        }
    }
}

/// Aggregate statistics over the whole history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStatistics {
    pub total_tests: usize,
    pub successful_tests: usize,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<f64>,
}

/// ISO-8601 timestamps.
///
/// Written as RFC 3339 in UTC. Older files carry naive local timestamps,
/// which are read as local time.
pub(crate) mod timestamp {
    use super::*;
    use chrono::SecondsFormat;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// Parse a timestamp from the history file.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    None
}

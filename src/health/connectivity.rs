//! Connectivity detection across redundant targets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::probe::{LatencySample, ProbeConfig, Prober};

/// Process-wide connection state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
    pub disconnect_count: u32,
    pub total_downtime_seconds: f64,
}

/// What a connectivity observation did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Restored,
    Lost,
    Unchanged,
}

impl ConnectionState {
    /// Fold one observation into the state.
    ///
    /// A true→false transition counts one disconnect; a false→true
    /// transition adds the time since the last disconnect to the downtime.
    pub fn observe(&mut self, connected: bool, now: DateTime<Utc>) -> Transition {
        let transition = match (self.is_connected, connected) {
            (false, true) => {
                if let Some(since) = self.last_disconnected_at {
                    let downtime = (now - since).num_milliseconds().max(0) as f64 / 1000.0;
                    self.total_downtime_seconds += downtime;
                }
                Transition::Restored
            }
            (true, false) => {
                self.disconnect_count += 1;
                self.last_disconnected_at = Some(now);
                Transition::Lost
            }
            _ => Transition::Unchanged,
        };

        self.is_connected = connected;
        if connected {
            self.last_connected_at = Some(now);
        }
        transition
    }
}

/// Outcome of a connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityResult {
    pub connected: bool,
    pub fastest_target: Option<String>,
    pub fastest_latency_ms: Option<f64>,
}

impl ConnectivityResult {
    /// Reduce samples, given in completion order, to a result.
    pub fn from_samples(samples: &[LatencySample]) -> Self {
        match fastest(samples) {
            Some((target, latency)) => Self {
                connected: true,
                fastest_target: Some(target.to_string()),
                fastest_latency_ms: Some(latency),
            },
            None => Self {
                connected: false,
                fastest_target: None,
                fastest_latency_ms: None,
            },
        }
    }
}

/// The successful sample with the lowest latency. On a tie the first one
/// observed wins.
pub fn fastest(samples: &[LatencySample]) -> Option<(&str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for sample in samples {
        if let Some(ms) = sample.round_trip_ms {
            if best.map_or(true, |(_, best_ms)| ms < best_ms) {
                best = Some((sample.target.as_str(), ms));
            }
        }
    }
    best
}

/// Probe every target concurrently and collect the samples in completion
/// order.
///
/// Probes still running when `ceiling` elapses are aborted and left out;
/// aborting drops their child processes, which kills them.
pub async fn fan_out(
    prober: &Prober,
    targets: &[String],
    count: u32,
    timeout: Duration,
    ceiling: Duration,
) -> Vec<LatencySample> {
    let mut set = JoinSet::new();
    for target in targets {
        let prober = prober.clone();
        let config = ProbeConfig::new(target, count, timeout);
        set.spawn(async move { prober.sample(&config).await });
    }

    let deadline = Instant::now() + ceiling;
    let mut samples = Vec::with_capacity(targets.len());

    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok(sample))) => samples.push(sample),
            Ok(Some(Err(e))) => tracing::debug!("Probe task failed: {}", e),
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    "Connectivity check abandoned {} probe(s) after {:?}",
                    set.len(),
                    ceiling
                );
                set.abort_all();
                break;
            }
        }
    }

    samples
}

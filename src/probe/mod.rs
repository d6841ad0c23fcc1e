//! Probe module for latency measurement.
//!
//! A probe asks an external capability (the system `ping` tool in
//! production) for one round-trip sample. Every failure mode degrades to an
//! absent latency; nothing here is fatal to the caller.

mod cache;
mod dns;
mod ping;

pub use cache::*;
pub use dns::*;
pub use ping::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("probe tool not found: {0}")]
    ToolMissing(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("probe exited with status {0:?}")]
    Exit(Option<i32>),
    #[error("no latency found in probe output")]
    Parse,
}

/// One probe request.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: String,
    pub count: u32,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(target: &str, count: u32, timeout: Duration) -> Self {
        Self {
            target: target.to_string(),
            count: count.max(1),
            timeout,
        }
    }
}

/// Raw outcome of running the external probe tool.
#[derive(Debug, Clone)]
pub struct ProbeOutput {
    /// Whether the tool reported success
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
}

/// A single probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    pub target: String,
    /// Round-trip time in milliseconds, `None` on failure
    pub round_trip_ms: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl LatencySample {
    pub fn new(target: &str, round_trip_ms: Option<f64>) -> Self {
        Self {
            target: target.to_string(),
            round_trip_ms,
            observed_at: Utc::now(),
        }
    }
}

/// The external probe capability.
///
/// Implementations run the probe and hand back its raw output; parsing is
/// done by [`Prober`].
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(&self, config: &ProbeConfig) -> Result<ProbeOutput, ProbeError>;
}

/// Probe abstraction: runs probes through a [`ProbeRunner`], parses their
/// output and consults the shared [`ResultCache`].
#[derive(Clone)]
pub struct Prober {
    runner: Arc<dyn ProbeRunner>,
    cache: Arc<ResultCache>,
}

impl Prober {
    pub fn new(runner: Arc<dyn ProbeRunner>, cache: Arc<ResultCache>) -> Self {
        Self { runner, cache }
    }

    /// Probe a target, reusing a recent cached result when one exists.
    ///
    /// Overlapping calls for the same target and count share one probe.
    pub async fn probe(&self, config: &ProbeConfig) -> Option<f64> {
        if let Some(cached) = self.cached(config) {
            return cached;
        }

        let gate = self.cache.gate(&config.target, config.count);
        let _guard = gate.lock().await;
        if let Some(cached) = self.cached(config) {
            return cached;
        }
        self.probe_fresh(config).await
    }

    fn cached(&self, config: &ProbeConfig) -> Option<Option<f64>> {
        let cached = self.cache.lookup(&config.target, config.count)?;
        tracing::debug!("Cache hit for {} (count={})", config.target, config.count);
        Some(cached)
    }

    /// Probe a target without reading the cache. The result still refreshes it.
    pub async fn probe_fresh(&self, config: &ProbeConfig) -> Option<f64> {
        match self.measure(config).await {
            Ok(latency) => {
                tracing::debug!("Ping to {}: {:.2}ms", config.target, latency);
                self.cache.record(&config.target, config.count, Some(latency));
                Some(latency)
            }
            Err(ProbeError::ToolMissing(tool)) => {
                tracing::error!("Probe tool '{}' not found on this system", tool);
                None
            }
            Err(ProbeError::Command(msg)) => {
                tracing::error!("Failed to run probe for {}: {}", config.target, msg);
                None
            }
            Err(e) => {
                match &e {
                    ProbeError::Timeout(_) => {
                        tracing::warn!("Ping to {} timed out", config.target)
                    }
                    ProbeError::Parse => {
                        tracing::warn!("Could not parse ping output for {}", config.target)
                    }
                    _ => tracing::debug!("Ping to {} failed: {}", config.target, e),
                }
                self.cache.record(&config.target, config.count, None);
                None
            }
        }
    }

    /// Probe a target and wrap the outcome in a [`LatencySample`].
    pub async fn sample(&self, config: &ProbeConfig) -> LatencySample {
        let round_trip_ms = self.probe(config).await;
        LatencySample::new(&config.target, round_trip_ms)
    }

    async fn measure(&self, config: &ProbeConfig) -> Result<f64, ProbeError> {
        let output = self.runner.run(config).await?;
        if !output.success {
            return Err(ProbeError::Exit(output.code));
        }
        parse_ping_output(&output.stdout).ok_or(ProbeError::Parse)
    }
}

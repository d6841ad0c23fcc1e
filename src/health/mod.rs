//! Health module for nethealth.
//!
//! [`HealthEngine`] owns the connection state, the probe cache and the
//! history, and exposes every scoring operation.

mod connectivity;
mod diagnosis;
mod score;
mod stability;

pub use connectivity::*;
pub use diagnosis::*;
pub use score::*;
pub use stability::*;

use crate::config::EngineConfig;
use crate::history::{HealthRecord, HistoryError, HistoryStatistics, HistoryStore};
use crate::probe::{
    DnsTimer, ProbeConfig, ProbeRunner, Prober, ResultCache, SystemPing, SystemResolver,
};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The scoring engine.
pub struct HealthEngine {
    config: EngineConfig,
    prober: Prober,
    dns: Arc<dyn DnsTimer>,
    connection: Mutex<ConnectionState>,
    history: Mutex<HistoryStore>,
}

impl HealthEngine {
    /// Create an engine probing with the system tools, loading the history
    /// from the configured location.
    pub fn new(config: EngineConfig) -> Self {
        let history = HistoryStore::open(config.history_path());
        let dns = Arc::new(SystemResolver::new(config.probe_timeout));
        Self::with_parts(config, Arc::new(SystemPing::default()), dns, history)
    }

    /// Create an engine from explicit collaborators.
    pub fn with_parts(
        config: EngineConfig,
        runner: Arc<dyn ProbeRunner>,
        dns: Arc<dyn DnsTimer>,
        history: HistoryStore,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_duration));
        Self {
            prober: Prober::new(runner, cache),
            config,
            dns,
            connection: Mutex::new(ConnectionState::default()),
            history: Mutex::new(history),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn connection(&self) -> MutexGuard<'_, ConnectionState> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Probe a single target once, reusing a recent result.
    pub async fn probe(&self, target: &str) -> Option<f64> {
        let config = ProbeConfig::new(target, 1, self.config.probe_timeout);
        self.prober.probe(&config).await
    }

    /// Probe every configured target concurrently and update the
    /// connection state.
    pub async fn check_connectivity(&self) -> ConnectivityResult {
        self.check_connectivity_with(&self.config.targets, self.config.connectivity_ceiling)
            .await
    }

    /// [`Self::check_connectivity`] against an explicit target set.
    pub async fn check_connectivity_with(
        &self,
        targets: &[String],
        ceiling: Duration,
    ) -> ConnectivityResult {
        let samples = fan_out(&self.prober, targets, 1, self.config.probe_timeout, ceiling).await;
        let result = ConnectivityResult::from_samples(&samples);
        self.observe_connectivity(result.connected, Utc::now());
        result
    }

    fn observe_connectivity(&self, connected: bool, now: DateTime<Utc>) {
        let mut state = self.connection();
        match state.observe(connected, now) {
            Transition::Restored => tracing::info!(
                "Connection restored (total downtime {:.1}s)",
                state.total_downtime_seconds
            ),
            Transition::Lost => tracing::warn!(
                "Connection lost (disconnect #{})",
                state.disconnect_count
            ),
            Transition::Unchanged => {}
        }
    }

    /// The target answering fastest over a longer measurement.
    pub async fn best_target(&self) -> Option<String> {
        let samples = fan_out(
            &self.prober,
            &self.config.targets,
            self.config.best_target_count,
            self.config.probe_timeout,
            self.config.best_target_ceiling,
        )
        .await;

        let (target, latency) = fastest(&samples)?;
        tracing::info!("Best target: {} ({:.2}ms)", target, latency);
        Some(target.to_string())
    }

    /// Score the primary target, returning only the number.
    pub async fn health_score(&self) -> u8 {
        self.health_report().await.score
    }

    /// Score the primary target with a full breakdown.
    pub async fn health_report(&self) -> HealthReport {
        let total = self.config.burst_size;
        let successes = self.run_burst(total).await;
        let uptime = self.history().recent_uptime_pct();
        score_burst(&successes, total, uptime)
    }

    async fn run_burst(&self, total: u32) -> Vec<f64> {
        let config = ProbeConfig::new(&self.config.primary_target, 1, self.config.probe_timeout);
        let mut successes = Vec::with_capacity(total as usize);

        for i in 0..total {
            if let Some(latency) = self.prober.probe_fresh(&config).await {
                successes.push(latency);
            }
            if i + 1 < total {
                tokio::time::sleep(self.config.burst_delay).await;
            }
        }
        successes
    }

    /// Measure the primary target, score it and append the result to the
    /// history.
    pub async fn log_sample(&self) -> HealthRecord {
        let latency = self.probe(&self.config.primary_target).await;
        let score = self.health_score().await;

        // stamp under the lock: append order is timestamp order
        let record = {
            let mut history = self.history();
            let record = HealthRecord::new(Utc::now(), latency, score);
            history.append(record.clone());
            record
        };

        tracing::debug!(
            "Sample logged: latency={:?} score={} ({})",
            record.latency,
            record.score,
            record.category
        );
        record
    }

    pub fn analyze_stability(&self) -> StabilityReport {
        let state = self.connection_state();
        let history = self.history();
        analyze(&state, !history.is_empty(), &history.recent_latencies())
    }

    /// Time the resolution of the configured DNS domain.
    pub async fn dns_resolution_ms(&self) -> Option<f64> {
        self.dns.resolve_ms(&self.config.dns_domain).await
    }

    /// Run every check in turn and derive recommendations.
    pub async fn run_full_diagnosis(&self) -> Diagnosis {
        tracing::info!("Starting full connection diagnosis");

        let connectivity = self.check_connectivity().await;
        let health = self.health_report().await;
        let dns_resolution_ms = if connectivity.connected {
            self.dns_resolution_ms().await
        } else {
            None
        };
        let stability = self.analyze_stability();
        let optimal_target = if connectivity.connected {
            self.best_target().await
        } else {
            None
        };
        let recommendations =
            recommendations(connectivity.connected, &health, dns_resolution_ms, &stability);

        tracing::info!(
            "Diagnosis complete: connected={} score={} ({}) stability={}",
            connectivity.connected,
            health.score,
            health.category,
            stability.stability_score
        );

        Diagnosis {
            timestamp: Utc::now(),
            connected: connectivity.connected,
            fastest_target: connectivity.fastest_target,
            optimal_target,
            health,
            dns_resolution_ms,
            stability,
            recommendations,
        }
    }

    /// The last `count` history records, oldest first.
    pub fn recent_records(&self, count: usize) -> Vec<HealthRecord> {
        self.history().recent(count)
    }

    pub fn aggregate_statistics(&self) -> Option<HistoryStatistics> {
        self.history().statistics()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection().clone()
    }

    /// Flush the history to disk.
    pub fn shutdown(&self) -> Result<(), HistoryError> {
        let history = self.history();
        history.save()?;
        tracing::info!("History flushed: {} records", history.len());
        Ok(())
    }
}

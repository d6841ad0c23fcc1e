//! Configuration module for nethealth.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const HISTORY_FILE_NAME: &str = "health_history.json";

/// Engine and server configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP port for the JSON API (default: 8080)
    pub http_port: u16,
    /// Target of the scoring burst and of logged samples
    pub primary_target: String,
    /// Redundant targets probed concurrently by connectivity checks
    pub targets: Vec<String>,
    /// Directory holding the history file (default: "data")
    pub data_dir: PathBuf,
    /// Interval of the periodic sampler, `None` disables it
    pub sample_interval: Option<Duration>,
    /// Domain resolved when timing DNS
    pub dns_domain: String,
    /// Per-probe timeout handed to the probe tool
    pub probe_timeout: Duration,
    /// How long a probe result may be reused
    pub cache_duration: Duration,
    /// Number of probes in one scoring burst
    pub burst_size: u32,
    /// Pause between two probes of a burst
    pub burst_delay: Duration,
    /// Wait ceiling of a connectivity fan-out
    pub connectivity_ceiling: Duration,
    /// Per-target probe count when picking the best target
    pub best_target_count: u32,
    /// Wait ceiling when picking the best target
    pub best_target_ceiling: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            primary_target: "8.8.8.8".to_string(),
            targets: vec![
                "8.8.8.8".to_string(),
                "1.1.1.1".to_string(),
                "208.67.222.222".to_string(),
            ],
            data_dir: PathBuf::from("data"),
            sample_interval: Some(Duration::from_secs(30)),
            dns_domain: "www.google.com".to_string(),
            probe_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(2),
            burst_size: 10,
            burst_delay: Duration::from_millis(50),
            connectivity_ceiling: Duration::from_secs(10),
            best_target_count: 3,
            best_target_ceiling: Duration::from_secs(15),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `NETHEALTH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `NETHEALTH_PRIMARY_TARGET`: scoring target (default: "8.8.8.8")
    /// - `NETHEALTH_TARGETS`: comma-separated connectivity targets
    /// - `NETHEALTH_DATA_DIR`: history directory (default: "data")
    /// - `NETHEALTH_SAMPLE_INTERVAL_SECS`: sampler interval, 0 disables (default: 30)
    /// - `NETHEALTH_DNS_DOMAIN`: domain for DNS timing (default: "www.google.com")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("NETHEALTH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(target) = env::var("NETHEALTH_PRIMARY_TARGET") {
            if !target.trim().is_empty() {
                cfg.primary_target = target.trim().to_string();
            }
        }

        if let Ok(list) = env::var("NETHEALTH_TARGETS") {
            let targets = parse_target_list(&list);
            if !targets.is_empty() {
                cfg.targets = targets;
            }
        }

        if let Ok(dir) = env::var("NETHEALTH_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = env::var("NETHEALTH_SAMPLE_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                cfg.sample_interval = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }

        if let Ok(domain) = env::var("NETHEALTH_DNS_DOMAIN") {
            if !domain.trim().is_empty() {
                cfg.dns_domain = domain.trim().to_string();
            }
        }

        cfg
    }

    /// Resolve where the history file lives.
    ///
    /// Uses `<data_dir>/health_history.json` when the directory can be
    /// created, otherwise `~/.health_tracker/health_history.json`.
    pub fn history_path(&self) -> PathBuf {
        match std::fs::create_dir_all(&self.data_dir) {
            Ok(()) => self.data_dir.join(HISTORY_FILE_NAME),
            Err(e) => {
                tracing::warn!(
                    "Cannot create data directory {}: {}",
                    self.data_dir.display(),
                    e
                );
                home_history_path().unwrap_or_else(|| self.data_dir.join(HISTORY_FILE_NAME))
            }
        }
    }
}

fn home_history_path() -> Option<PathBuf> {
    let dir = dirs::home_dir()?.join(".health_tracker");
    match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(dir.join(HISTORY_FILE_NAME)),
        Err(e) => {
            tracing::error!("Cannot create fallback directory {}: {}", dir.display(), e);
            None
        }
    }
}

/// Split a comma-separated list of targets, dropping blanks.
fn parse_target_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

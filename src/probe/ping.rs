//! Ping probe via the system `ping` command.
//!
//! Output varies by OS, locale and tool version, so parsing tries an ordered
//! list of patterns and falls back to averaging every `<n> ms` it can find.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::{ProbeConfig, ProbeError, ProbeOutput, ProbeRunner};

/// Extra time granted to the ping process beyond its own timeout.
const HARD_CUTOFF_GRACE: Duration = Duration::from_secs(2);

/// Fallback values at or above this are not real round trips.
const MAX_PLAUSIBLE_MS: f64 = 5000.0;

/// Operating system flavour, which decides the `ping` argument syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    Windows,
    MacOs,
    Linux,
}

impl PingFlavor {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            PingFlavor::Windows
        } else if cfg!(target_os = "macos") {
            PingFlavor::MacOs
        } else {
            PingFlavor::Linux
        }
    }
}

/// Build the `ping` arguments for one probe.
pub fn ping_args(flavor: PingFlavor, config: &ProbeConfig) -> Vec<String> {
    let count = config.count.to_string();
    match flavor {
        PingFlavor::Windows => vec![
            "-n".to_string(),
            count,
            "-w".to_string(),
            config.timeout.as_millis().to_string(),
            config.target.clone(),
        ],
        PingFlavor::MacOs => vec![
            "-c".to_string(),
            count,
            "-W".to_string(),
            config.timeout.as_millis().to_string(),
            config.target.clone(),
        ],
        PingFlavor::Linux => vec![
            "-c".to_string(),
            count,
            "-W".to_string(),
            config.timeout.as_secs().max(1).to_string(),
            config.target.clone(),
        ],
    }
}

/// Production runner that shells out to `ping`.
#[derive(Debug, Clone)]
pub struct SystemPing {
    program: String,
    flavor: PingFlavor,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
            flavor: PingFlavor::current(),
        }
    }
}

impl SystemPing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, keeping the host's argument syntax.
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProbeRunner for SystemPing {
    async fn run(&self, config: &ProbeConfig) -> Result<ProbeOutput, ProbeError> {
        let hard_cutoff = config.timeout + HARD_CUTOFF_GRACE;

        // kill_on_drop reaps the child when the cutoff fires or the task
        // running this probe is aborted.
        let child = Command::new(&self.program)
            .args(ping_args(self.flavor, config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(hard_cutoff, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ProbeError::ToolMissing(self.program.clone()))
            }
            Ok(Err(e)) => {
                return Err(ProbeError::Command(format!(
                    "failed to execute {}: {}",
                    self.program, e
                )))
            }
            Err(_) => return Err(ProbeError::Timeout(hard_cutoff)),
        };

        Ok(ProbeOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

type Matcher = fn(&str) -> Option<f64>;

/// Structured matchers, tried in order. First match wins.
const MATCHERS: [Matcher; 5] = [
    match_average_pt,
    match_average_en,
    match_rtt_summary,
    match_round_trip_summary,
    match_reply_time,
];

/// Parse ping command output for a latency in milliseconds.
pub fn parse_ping_output(output: &str) -> Option<f64> {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(output))
        .or_else(|| mean_of_ms_values(output))
}

fn first_capture(re: &Regex, output: &str) -> Option<f64> {
    re.captures(output)?.get(1)?.as_str().parse::<f64>().ok()
}

/// Windows, Portuguese locale: "Média = 15ms"
fn match_average_pt(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)m[ée]dia\s*=\s*(\d+(?:\.\d+)?)\s*ms").unwrap()
    });
    first_capture(re, output)
}

/// Windows, English locale: "Average = 15ms"
fn match_average_en(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)average\s*=\s*(\d+(?:\.\d+)?)\s*ms").unwrap()
    });
    first_capture(re, output)
}

/// Linux: "rtt min/avg/max/mdev = 12.3/45.6/78.9/10.2 ms"
fn match_rtt_summary(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)rtt\s+min/avg/max/(?:mdev|stddev)\s*=\s*[\d.]+/([\d.]+)/[\d.]+/[\d.]+\s*ms",
        )
        .unwrap()
    });
    first_capture(re, output)
}

/// macOS / BSD: "round-trip min/avg/max/stddev = 17.9/17.9/17.9/0.0 ms"
fn match_round_trip_summary(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)round-trip\s+min/avg/max/(?:mdev|stddev)\s*=\s*[\d.]+/([\d.]+)/[\d.]+/[\d.]+\s*ms",
        )
        .unwrap()
    });
    first_capture(re, output)
}

/// Per-reply line: "time=12.3 ms", "time<1ms"
fn match_reply_time(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)time[=<]\s*(\d+(?:\.\d+)?)\s*ms").unwrap()
    });
    first_capture(re, output)
}

/// Average every "<n> ms" below the plausibility limit.
fn mean_of_ms_values(output: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*ms").unwrap());

    let values: Vec<f64> = re
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .filter(|v| *v < MAX_PLAUSIBLE_MS)
        .collect();

    if values.is_empty() {
        tracing::debug!(
            "Unparsable ping output: {}",
            output.chars().take(200).collect::<String>()
        );
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

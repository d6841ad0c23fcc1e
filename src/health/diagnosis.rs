//! Full connection diagnosis and recommendations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::score::HealthReport;
use super::stability::StabilityReport;

const HIGH_LATENCY_MS: f64 = 100.0;
const HIGH_LOSS_PCT: f64 = 5.0;
const HIGH_JITTER_MS: f64 = 50.0;
const SLOW_DNS_MS: f64 = 100.0;
const MANY_DISCONNECTS: u32 = 5;

/// Result of a full diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub timestamp: DateTime<Utc>,
    pub connected: bool,
    /// Fastest target of the connectivity check
    pub fastest_target: Option<String>,
    /// Best target over a longer measurement, only looked up when connected
    pub optimal_target: Option<String>,
    pub health: HealthReport,
    pub dns_resolution_ms: Option<f64>,
    pub stability: StabilityReport,
    pub recommendations: Vec<String>,
}

/// Build the recommendation lines for a diagnosis. Never empty.
pub fn recommendations(
    connected: bool,
    health: &HealthReport,
    dns_ms: Option<f64>,
    stability: &StabilityReport,
) -> Vec<String> {
    let mut lines: Vec<&str> = Vec::new();

    if !connected {
        lines.extend([
            "CRITICAL: No internet connection",
            "  - Check the network cables",
            "  - Restart the router",
            "  - Check the network settings",
        ]);
    } else {
        if health.latency.as_ref().is_some_and(|l| l.avg > HIGH_LATENCY_MS) {
            lines.extend([
                "WARNING: High latency detected",
                "  - Look for downloads or uploads in progress",
                "  - Test again at a different time of day",
            ]);
        }
        if health.packet_loss_pct > HIGH_LOSS_PCT {
            lines.extend([
                "WARNING: Significant packet loss",
                "  - Check cables and connectors",
                "  - Try a wired connection instead of Wi-Fi",
            ]);
        }
        if health.jitter_ms > HIGH_JITTER_MS {
            lines.extend([
                "WARNING: High latency variation (jitter)",
                "  - Reduce the number of connected devices",
                "  - Prioritize traffic with QoS on the router",
            ]);
        }
        if dns_ms.is_some_and(|ms| ms > SLOW_DNS_MS) {
            lines.extend([
                "WARNING: Slow DNS resolution",
                "  - Consider a public DNS server (8.8.8.8, 1.1.1.1)",
            ]);
        }
        if stability.disconnect_events > MANY_DISCONNECTS {
            lines.extend([
                "WARNING: Multiple disconnections detected",
                "  - Check the stability of your provider",
                "  - Update the router firmware",
            ]);
        }
    }

    if lines.is_empty() {
        lines.push("OK: Healthy connection, no problems detected");
    }
    lines.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::score::score_burst;

    fn stability(disconnects: u32) -> StabilityReport {
        StabilityReport {
            stability_score: 100,
            disconnect_events: disconnects,
            total_downtime_seconds: 0.0,
            latency_variability_pct: 0.0,
            recommendation: String::new(),
        }
    }

    #[test]
    fn test_healthy_connection_gets_single_line() {
        let health = score_burst(&[12.0; 10], 10, Some(100.0));
        let lines = recommendations(true, &health, Some(20.0), &stability(0));
        assert_eq!(lines, vec!["OK: Healthy connection, no problems detected"]);
    }

    #[test]
    fn test_disconnected_gets_critical_block_only() {
        let health = HealthReport::disconnected(10);
        let lines = recommendations(false, &health, Some(500.0), &stability(9));
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("CRITICAL"));
        assert!(lines.iter().all(|l| !l.starts_with("WARNING")));
    }

    #[test]
    fn test_each_breach_adds_its_block() {
        // 6 answers out of 10 at 150/250ms: high latency, 40% loss, jitter > 50
        let health = score_burst(&[150.0, 250.0, 150.0, 250.0, 150.0, 250.0], 10, None);
        let lines = recommendations(true, &health, Some(150.0), &stability(6));
        let headers: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with("WARNING"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            headers,
            vec![
                "WARNING: High latency detected",
                "WARNING: Significant packet loss",
                "WARNING: High latency variation (jitter)",
                "WARNING: Slow DNS resolution",
                "WARNING: Multiple disconnections detected",
            ]
        );
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut health = score_burst(&[100.0; 10], 10, None);
        health.packet_loss_pct = 5.0;
        health.jitter_ms = 50.0;
        let lines = recommendations(true, &health, Some(100.0), &stability(5));
        assert_eq!(lines.len(), 1);
    }
}

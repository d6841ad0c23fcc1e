//! Connection stability from disconnect history and latency variance.

use serde::Serialize;

use super::connectivity::ConnectionState;
use super::score::{mean, sample_stdev};
use crate::history::round2;

/// Fewer latency samples than this yield a variability of zero.
const MIN_VARIANCE_SAMPLES: usize = 11;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityReport {
    pub stability_score: u8,
    pub disconnect_events: u32,
    pub total_downtime_seconds: f64,
    pub latency_variability_pct: f64,
    pub recommendation: String,
}

impl StabilityReport {
    fn no_history() -> Self {
        Self {
            stability_score: 100,
            disconnect_events: 0,
            total_downtime_seconds: 0.0,
            latency_variability_pct: 0.0,
            recommendation: "No historical data yet".to_string(),
        }
    }
}

/// Analyze stability.
///
/// `recent_latencies` are the latencies found among the most recent history
/// records; `has_history` is false when the history holds no records at all.
pub fn analyze(
    state: &ConnectionState,
    has_history: bool,
    recent_latencies: &[f64],
) -> StabilityReport {
    if !has_history {
        return StabilityReport::no_history();
    }

    let cv = coefficient_of_variation(recent_latencies);
    let disconnects = state.disconnect_count;
    let (stability_score, recommendation) = classify(disconnects, cv);

    StabilityReport {
        stability_score,
        disconnect_events: disconnects,
        total_downtime_seconds: round2(state.total_downtime_seconds),
        latency_variability_pct: round2(cv),
        recommendation: recommendation.to_string(),
    }
}

/// `stdev / mean * 100`; zero with too few samples or a zero mean.
pub fn coefficient_of_variation(latencies: &[f64]) -> f64 {
    if latencies.len() < MIN_VARIANCE_SAMPLES {
        return 0.0;
    }
    let m = mean(latencies);
    if m <= 0.0 {
        return 0.0;
    }
    sample_stdev(latencies) / m * 100.0
}

fn classify(disconnects: u32, cv: f64) -> (u8, &'static str) {
    if disconnects == 0 && cv < 20.0 {
        (100, "Excellent, stable connection")
    } else if disconnects < 3 && cv < 40.0 {
        (80, "Good connection with minor variation")
    } else if disconnects < 5 && cv < 60.0 {
        (60, "Unstable connection, consider restarting the router")
    } else {
        (40, "Very unstable connection, check wiring and hardware")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20 samples alternating mean ± delta, giving a known variation.
    fn latencies_with_cv(mean: f64, cv_pct: f64) -> Vec<f64> {
        let n = 20usize;
        // sample stdev of ±d over n values is d * sqrt(n / (n - 1))
        let d = cv_pct / 100.0 * mean / (n as f64 / (n as f64 - 1.0)).sqrt();
        (0..n)
            .map(|i| if i % 2 == 0 { mean + d } else { mean - d })
            .collect()
    }

    fn state(disconnects: u32) -> ConnectionState {
        ConnectionState {
            is_connected: true,
            disconnect_count: disconnects,
            total_downtime_seconds: 12.345,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_history_is_neutral() {
        let report = analyze(&state(7), false, &[]);
        assert_eq!(report.stability_score, 100);
        assert_eq!(report.disconnect_events, 0);
        assert_eq!(report.recommendation, "No historical data yet");
    }

    #[test]
    fn test_stable_connection() {
        let latencies = latencies_with_cv(40.0, 10.0);
        assert!((coefficient_of_variation(&latencies) - 10.0).abs() < 1e-9);

        let report = analyze(&state(0), true, &latencies);
        assert_eq!(report.stability_score, 100);
        assert_eq!(report.latency_variability_pct, 10.0);
    }

    #[test]
    fn test_unstable_connection() {
        let latencies = latencies_with_cv(40.0, 45.0);
        let report = analyze(&state(4), true, &latencies);
        assert_eq!(report.stability_score, 60);
        assert_eq!(report.disconnect_events, 4);
        assert_eq!(report.total_downtime_seconds, 12.35);
    }

    #[test]
    fn test_ladder() {
        assert_eq!(classify(0, 19.9).0, 100);
        assert_eq!(classify(0, 20.0).0, 80);
        assert_eq!(classify(2, 39.9).0, 80);
        assert_eq!(classify(3, 10.0).0, 60);
        assert_eq!(classify(4, 59.9).0, 60);
        assert_eq!(classify(5, 0.0).0, 40);
        assert_eq!(classify(0, 60.0).0, 40);
    }

    #[test]
    fn test_variation_needs_more_than_ten_samples() {
        let few = [10.0, 50.0, 10.0, 50.0, 10.0, 50.0, 10.0, 50.0, 10.0, 50.0];
        assert_eq!(coefficient_of_variation(&few), 0.0);

        let mut enough = few.to_vec();
        enough.push(10.0);
        assert!(coefficient_of_variation(&enough) > 0.0);
    }
}

//! Weighted health scoring.
//!
//! A probe burst is reduced to four sub-scores on fixed breakpoint ladders
//! (latency 40%, packet loss 30%, jitter 20%, uptime 10%). Crossing into a
//! degraded rung adds an alert.

use serde::Serialize;

use crate::history::{round2, HealthCategory};

/// Sub-score weights in tenths: latency, packet loss, jitter, uptime.
const WEIGHTS: [u32; 4] = [4, 3, 2, 1];

/// Latency figures over the successful probes of a burst.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Ladder positions of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubScores {
    pub latency: u8,
    pub packet_loss: u8,
    pub jitter: u8,
    pub uptime: u8,
}

impl SubScores {
    /// `floor(0.4 L + 0.3 P + 0.2 J + 0.1 U)`, computed in integers.
    pub fn weighted(&self) -> u8 {
        let parts = [self.latency, self.packet_loss, self.jitter, self.uptime];
        let total: u32 = parts
            .iter()
            .zip(WEIGHTS)
            .map(|(score, weight)| u32::from(*score) * weight)
            .sum();
        (total / 10).min(100) as u8
    }
}

/// Detailed result of a scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub score: u8,
    pub category: HealthCategory,
    /// Absent when no probe in the burst succeeded
    pub latency: Option<LatencySummary>,
    pub packet_loss_pct: f64,
    pub jitter_ms: f64,
    pub uptime_pct: f64,
    pub pings_successful: u32,
    pub pings_total: u32,
    pub alerts: Vec<String>,
}

impl HealthReport {
    /// The report for a burst in which every probe failed.
    pub fn disconnected(pings_total: u32) -> Self {
        Self {
            score: 0,
            category: HealthCategory::Disconnected,
            latency: None,
            packet_loss_pct: 100.0,
            jitter_ms: 0.0,
            uptime_pct: 0.0,
            pings_successful: 0,
            pings_total,
            alerts: vec!["No internet connection".to_string()],
        }
    }
}

/// Score a burst.
///
/// `successes` holds the latencies of the probes that answered out of
/// `total` sent; `uptime_pct` is the connected share of recent history,
/// `None` when there is no history yet.
pub fn score_burst(successes: &[f64], total: u32, uptime_pct: Option<f64>) -> HealthReport {
    if successes.is_empty() || total == 0 {
        return HealthReport::disconnected(total);
    }

    let avg = mean(successes);
    let min = successes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = successes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lost = total.saturating_sub(successes.len() as u32);
    let packet_loss = f64::from(lost) / f64::from(total) * 100.0;
    let jitter = sample_stdev(successes);
    let uptime = uptime_pct.unwrap_or(100.0);

    let mut alerts = Vec::new();
    let sub = SubScores {
        latency: latency_score(avg, &mut alerts),
        packet_loss: packet_loss_score(packet_loss, &mut alerts),
        jitter: jitter_score(jitter, &mut alerts),
        uptime: match uptime_pct {
            Some(pct) => uptime_score(pct, &mut alerts),
            None => 100,
        },
    };
    let score = sub.weighted();

    HealthReport {
        score,
        category: HealthCategory::from_score(score),
        latency: Some(LatencySummary {
            avg: round2(avg),
            min: round2(min),
            max: round2(max),
        }),
        packet_loss_pct: round2(packet_loss),
        jitter_ms: round2(jitter),
        uptime_pct: round2(uptime),
        pings_successful: successes.len() as u32,
        pings_total: total,
        alerts,
    }
}

/// Latency ladder: 20/50/100/200/300 ms.
pub fn latency_score(avg_ms: f64, alerts: &mut Vec<String>) -> u8 {
    if avg_ms < 20.0 {
        100
    } else if avg_ms < 50.0 {
        90
    } else if avg_ms < 100.0 {
        alerts.push(format!("Elevated latency: {avg_ms:.1}ms"));
        70
    } else if avg_ms < 200.0 {
        alerts.push(format!("High latency: {avg_ms:.1}ms"));
        50
    } else if avg_ms < 300.0 {
        alerts.push(format!("Critical latency: {avg_ms:.1}ms"));
        30
    } else {
        alerts.push(format!("Severe latency: {avg_ms:.1}ms"));
        10
    }
}

/// Packet loss ladder: 0/1/5/10/20 %.
pub fn packet_loss_score(loss_pct: f64, alerts: &mut Vec<String>) -> u8 {
    if loss_pct == 0.0 {
        100
    } else if loss_pct < 1.0 {
        95
    } else if loss_pct < 5.0 {
        alerts.push(format!("Packet loss: {loss_pct:.1}%"));
        80
    } else if loss_pct < 10.0 {
        alerts.push(format!("Significant packet loss: {loss_pct:.1}%"));
        60
    } else if loss_pct < 20.0 {
        alerts.push(format!("High packet loss: {loss_pct:.1}%"));
        40
    } else {
        alerts.push(format!("Critical packet loss: {loss_pct:.1}%"));
        20
    }
}

/// Jitter ladder: 5/10/30/50/100 ms.
pub fn jitter_score(jitter_ms: f64, alerts: &mut Vec<String>) -> u8 {
    if jitter_ms < 5.0 {
        100
    } else if jitter_ms < 10.0 {
        90
    } else if jitter_ms < 30.0 {
        70
    } else if jitter_ms < 50.0 {
        alerts.push(format!("Elevated jitter: {jitter_ms:.1}ms"));
        50
    } else if jitter_ms < 100.0 {
        alerts.push(format!("High jitter: {jitter_ms:.1}ms"));
        30
    } else {
        alerts.push(format!("Critical jitter: {jitter_ms:.1}ms"));
        10
    }
}

/// Uptime ladder: 99/95/90/80 %.
pub fn uptime_score(uptime_pct: f64, alerts: &mut Vec<String>) -> u8 {
    if uptime_pct >= 99.0 {
        100
    } else if uptime_pct >= 95.0 {
        85
    } else if uptime_pct >= 90.0 {
        70
    } else if uptime_pct >= 80.0 {
        alerts.push(format!("Low uptime: {uptime_pct:.1}%"));
        50
    } else {
        alerts.push(format!("Critical uptime: {uptime_pct:.1}%"));
        30
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 with fewer than two values.
pub(crate) fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

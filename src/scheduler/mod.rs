//! Scheduler module for periodic sampling.

use crate::health::HealthEngine;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Logs one health sample per interval until stopped.
pub struct Scheduler {
    engine: Arc<HealthEngine>,
    stop: Arc<Mutex<Option<broadcast::Sender<()>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(engine: Arc<HealthEngine>) -> Self {
        Self {
            engine,
            stop: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Start the sampling task. Does nothing if it is already running.
    pub async fn start(&self, interval: Duration) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let (tx, rx) = broadcast::channel(1);
        *self.stop.lock().await = Some(tx);

        tracing::info!("Scheduler: sampling every {:?}", interval);
        *task = Some(tokio::spawn(run_sample_loop(
            self.engine.clone(),
            interval,
            rx,
        )));
    }

    /// Stop the sampling task and wait for an in-flight sample to finish.
    pub async fn stop(&self) {
        if let Some(tx) = self.stop.lock().await.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler: sampling task failed: {}", e);
            }
        }
        tracing::info!("Scheduler: stopped");
    }
}

async fn run_sample_loop(
    engine: Arc<HealthEngine>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let record = engine.log_sample().await;
                tracing::info!(
                    "Sample: latency={} score={} ({})",
                    record
                        .latency
                        .map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.2}ms")),
                    record.score,
                    record.category
                );
            }
        }
    }
}

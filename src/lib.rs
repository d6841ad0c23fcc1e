//! nethealth - network health scoring engine
//!
//! Probes a set of targets with the system `ping` tool, scores the quality
//! of the connection and keeps a persisted history of scored samples.

pub mod config;
pub mod health;
pub mod history;
pub mod probe;
pub mod scheduler;
pub mod web;

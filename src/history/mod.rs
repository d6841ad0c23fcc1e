//! History module for nethealth.
//!
//! Keeps the most recent scored samples and persists them as a JSON file.

mod models;
mod store;

pub use models::*;
pub use store::*;

//! Shared fixtures for integration tests.

use std::sync::{Arc, Mutex};

use field_events_core::{Phase, Snapshot};
use serde_json::Value;

/// One recorded handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub phase: Phase,
    pub field: String,
    pub old_value: Value,
    pub value: Value,
    pub insert: bool,
}

pub type Log = Arc<Mutex<Vec<Invocation>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(value: Value) -> anyhow::Result<Snapshot> {
    Ok(Snapshot::from_json(value, "test")?)
}

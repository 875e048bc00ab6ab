//! Operator-facing observations.
//!
//! Sinks never fail: an observation that cannot be delivered is dropped and
//! validation carries on.

use crate::error::Stage;
use std::sync::Mutex;

/// Receives informational and warning-level observations.
pub trait ObservationSink: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Marks the start of a pipeline stage.
    fn stage_started(&self, stage: Stage) {
        self.info(&format!("START OF: {}", stage.to_string().to_uppercase()));
    }
}

/// Forwards observations to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn stage_started(&self, stage: Stage) {
        let separator = "-".repeat(80);
        tracing::info!("{separator}");
        tracing::info!(stage = %stage, "START OF: {}", stage.to_string().to_uppercase());
        tracing::info!("{separator}");
    }
}

/// Severity of a recorded observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// Keeps observations in memory, for embedding callers and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        // A poisoned lock only loses the observation.
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

impl ObservationSink for MemorySink {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }
}

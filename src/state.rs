//! Checkpoint state handling.
//!
//! The coordinator holds the single most-recently-seen STATE payload,
//! last-write-wins with no merging. Emitting writes that value as one JSON
//! line on the control output (the process's stdout), which is the
//! extractor's signal that every record up to that STATE has been durably
//! written. The driver is responsible for flushing the stream writers
//! before calling [`CheckpointCoordinator::emit`].

use std::io::Write;

use log::debug;
use serde_json::Value;

use crate::error::TargetError;

/// Holds the latest observed checkpoint and emits it on request.
#[derive(Debug, Default)]
pub struct CheckpointCoordinator {
    held: Option<Value>,
    pending: bool,
}

impl CheckpointCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held checkpoint unconditionally.
    pub fn observe(&mut self, value: Value) {
        self.held = Some(value);
        self.pending = true;
    }

    /// The currently held value, if any STATE has been observed.
    pub fn held(&self) -> Option<&Value> {
        self.held.as_ref()
    }

    /// Write the held value as one JSON line and flush the control output.
    /// A no-op when nothing has been observed, or when the held value was
    /// already emitted (so end-of-stream does not duplicate the last line).
    pub fn emit<W: Write>(&mut self, out: &mut W) -> Result<(), TargetError> {
        if !self.pending {
            return Ok(());
        }
        if let Some(value) = &self.held {
            let line = serde_json::to_string(value)?;
            debug!("emitting state {line}");
            writeln!(out, "{line}")?;
            out.flush()?;
            self.pending = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_without_observe_writes_nothing() {
        let mut coordinator = CheckpointCoordinator::new();
        let mut out = Vec::new();
        coordinator.emit(&mut out).unwrap();
        assert!(out.is_empty());
        assert!(coordinator.held().is_none());
    }

    #[test]
    fn emit_writes_exactly_the_last_observed_value() {
        let mut coordinator = CheckpointCoordinator::new();
        coordinator.observe(json!({"users": 1}));
        coordinator.observe(json!({"users": 5}));

        let mut out = Vec::new();
        coordinator.emit(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"users\":5}\n");
    }

    #[test]
    fn emit_is_idempotent_until_the_next_observe() {
        let mut coordinator = CheckpointCoordinator::new();
        coordinator.observe(json!({"n": 1}));

        let mut out = Vec::new();
        coordinator.emit(&mut out).unwrap();
        coordinator.emit(&mut out).unwrap();
        assert_eq!(String::from_utf8_lossy(&out), "{\"n\":1}\n");

        let mut out = Vec::new();
        coordinator.observe(json!({"n": 2}));
        coordinator.emit(&mut out).unwrap();
        assert_eq!(String::from_utf8_lossy(&out), "{\"n\":2}\n");
    }
}

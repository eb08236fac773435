//! The pipeline driver.
//!
//! Owns all per-run state (schema registry, writer set, checkpoint
//! coordinator, validators) and processes the input strictly in arrival
//! order: CSV row ordering and checkpoint correctness both depend on it.
//! Records are always flushed before the STATE that followed them is
//! emitted — that ordering is the resumability contract with the upstream
//! extractor.
//!
//! The driver runs until end-of-input or the first fatal error. A fatal
//! error propagates out immediately with no further emission; the last
//! emitted STATE remains the valid resume point.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, Write};

use log::{debug, warn};
use serde_json::{json, Map, Value};

use crate::config::PipelineOptions;
use crate::error::TargetError;
use crate::flatten::flatten;
use crate::message::{decode_line, Message, RecordMessage};
use crate::registry::{sanitize_stream_name, SchemaRegistry};
use crate::state::CheckpointCoordinator;
use crate::validate::RecordValidators;
use crate::writer::{SinkConfig, StreamWriterSet};

/// When the held checkpoint is emitted on the control output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmitPolicy {
    /// Flush all writers and emit after every STATE message.
    #[default]
    EveryState,
    /// Emit only once, after the input stream is exhausted.
    EndOfStream,
}

/// Orchestrates decode → dispatch → flush → emit over an input stream.
pub struct Pipeline {
    registry: SchemaRegistry,
    writers: StreamWriterSet,
    coordinator: CheckpointCoordinator,
    validators: RecordValidators,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(sink: SinkConfig, options: PipelineOptions) -> Result<Self, TargetError> {
        Ok(Pipeline {
            registry: SchemaRegistry::new(),
            writers: StreamWriterSet::new(sink)?,
            coordinator: CheckpointCoordinator::new(),
            validators: RecordValidators::new(),
            options,
        })
    }

    /// Process the whole input stream, writing checkpoint lines to
    /// `control`. Returns when the input is exhausted (clean end) or on
    /// the first fatal error.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        control: &mut W,
    ) -> Result<(), TargetError> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match decode_line(&line) {
                Ok(message) => self.dispatch(message, control)?,
                Err(TargetError::UnsupportedMessageType(kind)) => {
                    warn!("skipping unsupported message type {kind}");
                }
                Err(err) => return Err(err),
            }
        }
        self.finish(control)
    }

    fn dispatch<W: Write>(
        &mut self,
        message: Message,
        control: &mut W,
    ) -> Result<(), TargetError> {
        match message {
            Message::Schema(schema) => {
                let stream = self.registry.register(&schema)?;
                debug!("registered schema for stream {stream}");
                if self.options.validate {
                    self.validators.compile(&stream, &schema.schema);
                }
            }
            Message::Record(record) => self.write_record(&record)?,
            Message::State(state) => {
                self.coordinator.observe(state.value);
                if self.options.emit_policy == EmitPolicy::EveryState {
                    self.writers.flush_all()?;
                    self.coordinator.emit(control)?;
                }
            }
        }
        Ok(())
    }

    fn write_record(&mut self, record: &RecordMessage) -> Result<(), TargetError> {
        let stream = sanitize_stream_name(&record.stream);
        let schema = self.registry.lookup(&stream)?;

        if self.options.validate && !self.validators.check(&stream, &record.record) {
            // Violations were logged by the validator; drop the record.
            return Ok(());
        }

        // Fixed headers (when configured) override schema-derived columns
        // for the file; either way the ordering is frozen once the file is
        // open and later schema replacements do not re-shape it.
        let columns: &[String] = match self.options.fixed_headers.get(&stream) {
            Some(fixed) => fixed,
            None => &schema.columns,
        };
        let file = self.writers.file_for(&stream, columns)?;
        let flat = flatten(file.columns(), &record.record)?;
        file.write(&flat)
    }

    /// End-of-stream: flush everything, emit the final checkpoint, record
    /// job metrics.
    fn finish<W: Write>(&mut self, control: &mut W) -> Result<(), TargetError> {
        self.writers.flush_all()?;
        self.coordinator.emit(control)?;
        self.write_job_metrics()?;
        Ok(())
    }

    /// Write per-stream record counts to `job_metrics.json` in the
    /// destination directory. Skipped when no records were written.
    fn write_job_metrics(&self) -> Result<(), TargetError> {
        let counts: Map<String, Value> = self
            .writers
            .record_counts()
            .map(|(stream, count)| (stream.to_string(), json!(count)))
            .collect();
        if counts.is_empty() {
            return Ok(());
        }
        let metrics = json!({ "recordCount": counts });
        let path = self.writers.destination().join("job_metrics.json");
        let file = File::create(path)?;
        serde_json::to_writer(file, &metrics)?;
        Ok(())
    }

    /// Per-stream counts of rows written so far.
    pub fn record_counts(&self) -> HashMap<String, u64> {
        self.writers
            .record_counts()
            .map(|(stream, count)| (stream.to_string(), count))
            .collect()
    }
}

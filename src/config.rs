//! Configuration file handling.
//!
//! The config is a JSON file in the shape the original target accepts:
//! every field optional, with defaults matching plain comma-separated CSV
//! written to the current directory.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::TargetError;
use crate::pipeline::EmitPolicy;
use crate::writer::SinkConfig;

/// The target's configuration surface. Everything here affects either the
/// stream writer or the driver's emission/validation behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Field delimiter (default `,`).
    pub delimiter: Option<char>,
    /// Quote character (default `"`).
    pub quotechar: Option<char>,
    /// Directory CSV files are written into (default `.`).
    pub destination_path: Option<String>,
    /// Filename template with `{stream}` and `{timestamp}` placeholders
    /// (default `{stream}.csv`).
    pub naming_template: Option<String>,
    /// Append to existing files instead of truncating (default false).
    pub append: Option<bool>,
    /// When checkpoints are emitted: `every-state` (default) or
    /// `end-of-stream`.
    pub emit_policy: Option<EmitPolicy>,
    /// Validate records against their stream's schema (default false).
    pub validate: Option<bool>,
    /// Per-stream header lists that override schema-derived columns.
    pub fixed_headers: Option<HashMap<String, Vec<String>>>,
}

impl Config {
    /// Load the config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TargetError> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// The writer-facing half of the config.
    pub fn sink_config(&self) -> SinkConfig {
        let defaults = SinkConfig::default();
        SinkConfig {
            destination: self
                .destination_path
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or(defaults.destination),
            delimiter: self.delimiter.map(|c| c as u8).unwrap_or(defaults.delimiter),
            quote: self.quotechar.map(|c| c as u8).unwrap_or(defaults.quote),
            naming_template: self
                .naming_template
                .clone()
                .unwrap_or(defaults.naming_template),
            append: self.append.unwrap_or(defaults.append),
        }
    }

    /// The driver-facing half of the config.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            emit_policy: self.emit_policy.unwrap_or_default(),
            validate: self.validate.unwrap_or(false),
            fixed_headers: self.fixed_headers.clone().unwrap_or_default(),
        }
    }
}

/// Driver behavior knobs, derived from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub emit_policy: EmitPolicy,
    pub validate: bool,
    pub fixed_headers: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        let sink = config.sink_config();
        assert_eq!(sink.delimiter, b',');
        assert_eq!(sink.quote, b'"');
        assert_eq!(sink.destination, PathBuf::from("."));
        assert_eq!(sink.naming_template, "{stream}.csv");
        assert!(!sink.append);

        let options = config.pipeline_options();
        assert_eq!(options.emit_policy, EmitPolicy::EveryState);
        assert!(!options.validate);
        assert!(options.fixed_headers.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let config: Config = serde_json::from_str(
            r#"{
                "delimiter": "\t",
                "quotechar": "'",
                "destination_path": "/tmp/out",
                "naming_template": "{stream}-{timestamp}.csv",
                "append": true,
                "emit_policy": "end-of-stream",
                "validate": true,
                "fixed_headers": {"users": ["id", "name"]}
            }"#,
        )
        .unwrap();

        let sink = config.sink_config();
        assert_eq!(sink.delimiter, b'\t');
        assert_eq!(sink.quote, b'\'');
        assert_eq!(sink.destination, PathBuf::from("/tmp/out"));
        assert!(sink.append);

        let options = config.pipeline_options();
        assert_eq!(options.emit_policy, EmitPolicy::EndOfStream);
        assert!(options.validate);
        assert_eq!(options.fixed_headers["users"], vec!["id", "name"]);
    }
}

//! Per-stream CSV output.
//!
//! One [`StreamFile`] per stream name, created lazily when the first
//! record for that stream arrives. The header row is written exactly once
//! per destination, and the column ordering captured at that moment is
//! frozen for the life of the file: later SCHEMA replacements change the
//! registry but never re-shape an open file. Escaping follows RFC 4180 via
//! the csv crate (`QuoteStyle::Necessary`: fields containing the
//! delimiter, quote, or a line break are quoted, internal quotes doubled).
//!
//! Any write failure is fatal for the run. Partial files are left in
//! place; resuming is the upstream extractor's job via checkpoint state.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::{QuoteStyle, Writer, WriterBuilder};

use crate::error::TargetError;
use crate::flatten::FlatRecord;

/// Configuration for the CSV sink. All knobs come from the config file;
/// none affect anything but writer behavior.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Directory the CSV files are written into.
    pub destination: PathBuf,
    /// Field delimiter, a single ASCII byte.
    pub delimiter: u8,
    /// Quote character, a single ASCII byte.
    pub quote: u8,
    /// Filename template; `{stream}` and `{timestamp}` are expanded.
    pub naming_template: String,
    /// Append to existing files instead of truncating. When appending to a
    /// non-empty file the header row is skipped.
    pub append: bool,
}

impl SinkConfig {
    pub const DEFAULT_TEMPLATE: &'static str = "{stream}.csv";
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            destination: PathBuf::from("."),
            delimiter: b',',
            quote: b'"',
            naming_template: Self::DEFAULT_TEMPLATE.to_string(),
            append: false,
        }
    }
}

/// The open CSV destination for one stream.
pub struct StreamFile {
    writer: Writer<File>,
    columns: Vec<String>,
    rows_written: u64,
}

impl StreamFile {
    fn open(
        config: &SinkConfig,
        run_timestamp: &str,
        stream: &str,
        columns: &[String],
    ) -> Result<Self, TargetError> {
        let filename = config
            .naming_template
            .replace("{stream}", stream)
            .replace("{timestamp}", run_timestamp);
        let path = config.destination.join(filename);

        let skip_header = config.append && is_non_empty_file(&path);

        let file = if config.append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            File::create(&path)?
        };

        let mut writer = WriterBuilder::new()
            .delimiter(config.delimiter)
            .quote(config.quote)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(file);

        if !skip_header {
            writer.write_record(columns)?;
        }

        Ok(StreamFile {
            writer,
            columns: columns.to_vec(),
            rows_written: 0,
        })
    }

    /// The column ordering captured when this file was opened.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Write one row. The record must have been flattened against
    /// [`Self::columns`].
    pub fn write(&mut self, record: &FlatRecord) -> Result<(), TargetError> {
        self.writer.write_record(record.cells())?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TargetError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    path.metadata().map(|m| m.len() > 0).unwrap_or(false)
}

/// Owns every open [`StreamFile`], keyed by stream name.
pub struct StreamWriterSet {
    config: SinkConfig,
    run_timestamp: String,
    files: HashMap<String, StreamFile>,
}

impl StreamWriterSet {
    /// Create the writer set, making sure the destination directory exists.
    /// The `{timestamp}` placeholder is captured once here so every file of
    /// a run shares the same stamp.
    pub fn new(config: SinkConfig) -> Result<Self, TargetError> {
        std::fs::create_dir_all(&config.destination)?;
        Ok(StreamWriterSet {
            config,
            run_timestamp: Utc::now().format("%Y%m%dT%H%M%S").to_string(),
            files: HashMap::new(),
        })
    }

    /// Get the open file for a stream, creating it (and writing the header)
    /// on first use. `columns` is only consulted when the file is first
    /// opened; afterwards the file's captured ordering wins.
    pub fn file_for(
        &mut self,
        stream: &str,
        columns: &[String],
    ) -> Result<&mut StreamFile, TargetError> {
        match self.files.entry(stream.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = StreamFile::open(&self.config, &self.run_timestamp, stream, columns)?;
                Ok(entry.insert(file))
            }
        }
    }

    /// Flush every open file. Called before any checkpoint emission so the
    /// emitted state never runs ahead of the rows it covers.
    pub fn flush_all(&mut self) -> Result<(), TargetError> {
        for file in self.files.values_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// Rows written so far, per stream.
    pub fn record_counts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.files
            .iter()
            .map(|(stream, file)| (stream.as_str(), file.rows_written))
    }

    pub fn destination(&self) -> &Path {
        &self.config.destination
    }
}

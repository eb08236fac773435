//! # target-csv - Singer CSV target
//!
//! A Singer.io target: reads a stream of newline-delimited JSON messages
//! (SCHEMA, RECORD, STATE) on stdin, writes one CSV file per stream, and
//! echoes checkpoint STATE lines on stdout once the records they cover
//! have been flushed, so the upstream extractor can resume safely.
//!
//! ## Modules
//!
//! - **message**: decode one input line into a tagged Singer message
//! - **registry**: per-stream schemas and derived column orderings
//! - **flatten**: nested JSON record → flat CSV row
//! - **writer**: lazy per-stream CSV files with header-once semantics
//! - **state**: checkpoint holding and emission
//! - **pipeline**: the sequential driver tying it all together
//!
//! ## Quick Start
//!
//! ```rust
//! use target_csv::{decode_line, flatten, Message};
//!
//! # fn main() -> Result<(), target_csv::TargetError> {
//! let message = decode_line(r#"{"type":"RECORD","stream":"users","record":{"id":1,"name":"Ann"}}"#)?;
//!
//! let columns = vec!["id".to_string(), "name".to_string()];
//! if let Message::Record(record) = message {
//!     let row = flatten(&columns, &record.record)?;
//!     let cells: Vec<&str> = row.cells().collect();
//!     assert_eq!(cells, vec!["1", "Ann"]);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::{BufRead, Write};

pub mod config;
pub mod error;
pub mod flatten;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod validate;
pub mod writer;

// Re-export commonly used types for convenience
pub use config::{Config, PipelineOptions};
pub use error::TargetError;
pub use flatten::{flatten, FlatRecord};
pub use message::{decode_line, Message, RecordMessage, SchemaMessage, StateMessage};
pub use pipeline::{EmitPolicy, Pipeline};
pub use registry::{SchemaRegistry, StreamSchema};
pub use state::CheckpointCoordinator;
pub use writer::{SinkConfig, StreamWriterSet};

/// Main entry point: run the full pipeline over an input stream, writing
/// checkpoint lines to `control`.
pub fn run<R: BufRead, W: Write>(
    input: R,
    control: &mut W,
    config: &Config,
) -> Result<(), TargetError> {
    let mut pipeline = Pipeline::new(config.sink_config(), config.pipeline_options())?;
    pipeline.run(input, control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_then_flatten_produces_a_row() {
        let message =
            decode_line(r#"{"type":"RECORD","stream":"users","record":{"name":"Ann","id":1}}"#)
                .unwrap();
        let columns = vec!["id".to_string(), "name".to_string()];
        match message {
            Message::Record(record) => {
                let row = flatten(&columns, &record.record).unwrap();
                assert_eq!(row.get("id"), Some("1"));
                assert_eq!(row.get("name"), Some("Ann"));
            }
            other => panic!("expected RECORD, got {other:?}"),
        }
    }
}

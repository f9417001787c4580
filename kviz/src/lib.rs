//! kviz core: ktrace ingestion, model construction, and the query
//! surface the timeline viewer renders from.

pub mod cli;
pub mod clock;
pub mod domain;
pub mod export;
pub mod ingest;
pub mod model;
pub mod query;
pub mod reader;

pub use ingest::{IngestOptions, IngestStats, Ingestor, PairPolicy};
pub use model::Trace;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::TraceError;
use crate::reader::RecordReader;

/// Open, ingest, and finalize a trace file.
///
/// Framing anomalies inside the file keep the partial model; only I/O
/// failure is an error.
pub fn load_file(
    path: &Path,
    options: &IngestOptions,
    limit: Option<u64>,
) -> Result<(Trace, IngestStats), TraceError> {
    let file = File::open(path)?;
    let src = BufReader::new(file);
    let mut reader = match limit {
        Some(units) => RecordReader::with_limit(src, units),
        None => RecordReader::new(src),
    };
    let mut ingestor = Ingestor::new(options);
    ingestor.run(&mut reader)?;
    Ok(ingestor.finish())
}

//! Per-chunk CSV performance log.
//!
//! One row per released chunk, appended in release order (which equals file
//! order). The schema is fixed and unquoted; rows are flushed as they are
//! written so the log is useful even after a failed run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::chunk::Chunk;
use crate::errors::ScanResult;

pub const LOG_HEADER: &str = "process_id,file_offset,bytes_read,elapsed_time,found";

/// CSV sink for chunk rows.
#[derive(Debug)]
pub struct ChunkLog<W: Write> {
    out: W,
}

impl ChunkLog<BufWriter<File>> {
    /// Creates (or truncates) the log file and writes the header.
    pub fn create(path: &Path) -> ScanResult<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> ChunkLog<W> {
    /// Wraps a writer, emitting the header immediately.
    pub fn new(mut out: W) -> ScanResult<Self> {
        writeln!(out, "{LOG_HEADER}")?;
        out.flush()?;
        Ok(ChunkLog { out })
    }

    /// Consumes the log, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Appends one row for a released chunk.
    pub fn record(&mut self, chunk: &Chunk, found: bool) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{:.6},{}",
            chunk.worker,
            chunk.offset,
            chunk.len(),
            chunk.elapsed,
            found as u8
        )?;
        self.out.flush()
    }
}

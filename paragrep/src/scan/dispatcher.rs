use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::chunk::{read_up_to, trim_to_last_newline, FileRange, CHUNK_SIZE};
use crate::errors::ScanResult;

/// Hands out byte ranges on demand, reading ahead of the workers to place
/// each chunk's end on a line boundary.
///
/// The dispatcher probes the file with its own handle, trims the probe to
/// the last newline it contains, advances the assignment cursor by the
/// trimmed length, and discards the probe bytes; the worker re-reads the
/// range itself. Keeping the bulk bytes off the assignment pipe keeps the
/// coordinator cheap.
#[derive(Debug)]
pub struct Dispatcher<F: Read + Seek = File> {
    file: F,
    next_offset: u64,
    exhausted: bool,
}

impl<F: Read + Seek> Dispatcher<F> {
    pub fn new(file: F) -> Self {
        Dispatcher {
            file,
            next_offset: 0,
            exhausted: false,
        }
    }

    /// Offset the next assignment would start at.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Returns the next range to assign, or `None` once the file is
    /// exhausted. Exhaustion is sticky: every later call returns `None`
    /// without touching the file.
    pub fn next_range(&mut self) -> ScanResult<Option<FileRange>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut probe = [0u8; CHUNK_SIZE];
        self.file.seek(SeekFrom::Start(self.next_offset))?;
        let raw = read_up_to(&mut self.file, &mut probe)?;
        if raw == 0 {
            debug!(offset = self.next_offset, "assignments exhausted");
            self.exhausted = true;
            return Ok(None);
        }

        let effective = trim_to_last_newline(&probe[..raw]);
        let range = FileRange {
            offset: self.next_offset,
            len: effective as u64,
        };
        self.next_offset += effective as u64;
        Ok(Some(range))
    }
}

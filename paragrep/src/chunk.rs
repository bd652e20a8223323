//! Chunk geometry and read rules shared by the dispatcher and the workers.

use std::io::{ErrorKind, Read};

/// Fixed chunk size: the dispatcher never assigns more than this many bytes
/// and workers read into a buffer of exactly this size.
pub const CHUNK_SIZE: usize = 8192;

/// A contiguous byte region of the input file.
///
/// Invariant: `offset + len` never exceeds the file size at the time the
/// range is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRange {
    pub offset: u64,
    pub len: u64,
}

/// One worker result: a trimmed chunk of the file plus its read metrics.
///
/// The payload is owned exclusively by the chunk from receipt until the
/// stitcher consumes it; `len` is always `payload.len()` and is the amount
/// the processing cursor advances by.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub worker: u32,
    pub offset: u64,
    pub elapsed: f64,
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Returns the number of usable bytes when a read is trimmed to end at the
/// last newline it contains.
///
/// The cut falls just past the last `\n`; a read with no newline, a read
/// ending in `\n`, and a read whose trim would leave nothing all keep their
/// full length. Aligning chunk ends to line ends this way keeps every
/// paragraph delimiter intact across chunk boundaries.
pub fn trim_to_last_newline(buf: &[u8]) -> usize {
    match buf.iter().rposition(|&b| b == b'\n') {
        Some(pos) if pos + 1 < buf.len() => pos + 1,
        _ => buf.len(),
    }
}

/// Reads until the buffer is full or the source runs out, retrying
/// interrupted reads. Returns the number of bytes read.
pub(crate) fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

//! Worker process side of the scan pipeline.
//!
//! A worker owns its own read handle on the input file and repeats one cycle
//! until told to stop: request work, receive a byte range, seek and read it,
//! trim the read to its last newline, and report the trimmed bytes together
//! with the wall-clock time the read took. Workers never see the pattern and
//! never interpret content; any I/O failure ends the process with a non-zero
//! status, which the coordinator turns into a run failure.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::chunk::{read_up_to, trim_to_last_newline, Chunk, CHUNK_SIZE};
use crate::errors::{ScanError, ScanResult};
use crate::protocol::{self, Assignment};

/// Runs the worker loop over the process's stdin/stdout pipes.
pub fn run(id: u32, file: &Path) -> ScanResult<()> {
    let mut file = File::open(file)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut results = BufWriter::new(stdout.lock());
    run_loop(id, &mut file, &mut stdin.lock(), &mut results)
}

/// One request/assignment/result cycle per iteration, until stop.
fn run_loop(
    id: u32,
    file: &mut (impl Read + Seek),
    assignments: &mut impl Read,
    results: &mut impl Write,
) -> ScanResult<()> {
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        protocol::write_request(results, id)?;

        let range = match protocol::read_assignment(assignments)? {
            Assignment::Stop => break,
            Assignment::Range(range) => range,
        };
        if range.len > CHUNK_SIZE as u64 {
            return Err(ScanError::protocol_error(format!(
                "assigned range of {} bytes exceeds the {CHUNK_SIZE}-byte chunk size",
                range.len
            )));
        }

        file.seek(SeekFrom::Start(range.offset))?;
        let start = Instant::now();
        let read = read_up_to(file, &mut buf[..range.len as usize])?;
        let usable = trim_to_last_newline(&buf[..read]);
        let elapsed = start.elapsed().as_secs_f64();

        debug!(
            worker = id,
            offset = range.offset,
            read,
            usable,
            "chunk read"
        );

        let chunk = Chunk {
            worker: id,
            offset: range.offset,
            elapsed,
            payload: buf[..usable].to_vec(),
        };
        protocol::write_result(results, &chunk)?;
    }

    debug!(worker = id, "stop received, exiting");
    Ok(())
}

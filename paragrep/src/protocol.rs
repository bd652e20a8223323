//! Framed message protocol spoken over the coordinator/worker pipes.
//!
//! Every message is a fixed-width little-endian header followed by an
//! optional payload whose length the header carries. Upstream (worker to
//! coordinator) frames start with a `u32` tag; downstream assignments use a
//! fixed stop-flag/offset/length layout and need no tag because the worker
//! always knows one is coming.
//!
//! Reads and writes go through `read_exact`/`write_all`, which loop over
//! partial transfers and retry interrupted calls. The only place end of
//! stream is legal is the tag position of an upstream frame: a clean EOF
//! there means the worker closed its pipe, while EOF anywhere else is a
//! truncated frame and fails the run.

use std::io::{self, ErrorKind, Read, Write};

use crate::chunk::{Chunk, FileRange, CHUNK_SIZE};
use crate::errors::{ScanError, ScanResult};

pub const TAG_REQUEST: u32 = 1;
pub const TAG_RESULT: u32 = 2;

const ASSIGN_STOP: u8 = 1;
const ASSIGN_RANGE: u8 = 0;

/// A message sent from a worker to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Pull signal: the worker is ready for more work.
    Request { worker: u32 },
    /// A completed chunk with its payload and read metrics.
    Result(Chunk),
}

/// A message sent from the coordinator to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// No more work; the worker exits cleanly.
    Stop,
    /// A byte range for the worker to read.
    Range(FileRange),
}

/// Reads one `u32`, returning `None` on a clean end of stream.
///
/// A zero-byte first read is the peer closing its pipe; any later short read
/// is a truncated frame. Interrupted reads are retried.
fn read_u32_or_eof(reader: &mut impl Read) -> io::Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream closed inside a frame",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(u32::from_le_bytes(buf)))
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(reader: &mut impl Read) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_u8(reader: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads the next upstream frame, or `None` if the worker closed its pipe.
pub fn read_frame(reader: &mut impl Read) -> ScanResult<Option<Frame>> {
    let tag = match read_u32_or_eof(reader)? {
        Some(tag) => tag,
        None => return Ok(None),
    };

    match tag {
        TAG_REQUEST => {
            let worker = read_u32(reader)?;
            Ok(Some(Frame::Request { worker }))
        }
        TAG_RESULT => {
            let worker = read_u32(reader)?;
            let offset = read_u64(reader)?;
            let len = read_u64(reader)?;
            let elapsed = read_f64(reader)?;
            if len > CHUNK_SIZE as u64 {
                return Err(ScanError::protocol_error(format!(
                    "result payload of {len} bytes exceeds the {CHUNK_SIZE}-byte chunk size"
                )));
            }
            let mut payload = vec![0u8; len as usize];
            reader.read_exact(&mut payload)?;
            Ok(Some(Frame::Result(Chunk {
                worker,
                offset,
                elapsed,
                payload,
            })))
        }
        other => Err(ScanError::protocol_error(format!(
            "unknown message tag {other}"
        ))),
    }
}

/// Writes a request frame and flushes it onto the pipe.
pub fn write_request(writer: &mut impl Write, worker: u32) -> io::Result<()> {
    writer.write_all(&TAG_REQUEST.to_le_bytes())?;
    writer.write_all(&worker.to_le_bytes())?;
    writer.flush()
}

/// Writes a result frame and flushes it onto the pipe.
pub fn write_result(writer: &mut impl Write, chunk: &Chunk) -> io::Result<()> {
    writer.write_all(&TAG_RESULT.to_le_bytes())?;
    writer.write_all(&chunk.worker.to_le_bytes())?;
    writer.write_all(&chunk.offset.to_le_bytes())?;
    writer.write_all(&chunk.len().to_le_bytes())?;
    writer.write_all(&chunk.elapsed.to_le_bytes())?;
    writer.write_all(&chunk.payload)?;
    writer.flush()
}

/// Reads one assignment. End of stream here is a protocol violation: the
/// coordinator always answers a request with either a range or a stop.
pub fn read_assignment(reader: &mut impl Read) -> ScanResult<Assignment> {
    match read_u8(reader)? {
        ASSIGN_STOP => Ok(Assignment::Stop),
        ASSIGN_RANGE => {
            let offset = read_u64(reader)?;
            let len = read_u64(reader)?;
            Ok(Assignment::Range(FileRange { offset, len }))
        }
        other => Err(ScanError::protocol_error(format!(
            "unknown assignment flag {other}"
        ))),
    }
}

/// Writes an assignment and flushes it onto the pipe.
pub fn write_assignment(writer: &mut impl Write, assignment: Assignment) -> io::Result<()> {
    match assignment {
        Assignment::Stop => writer.write_all(&[ASSIGN_STOP])?,
        Assignment::Range(range) => {
            writer.write_all(&[ASSIGN_RANGE])?;
            writer.write_all(&range.offset.to_le_bytes())?;
            writer.write_all(&range.len.to_le_bytes())?;
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_round_trip() {
        let mut buf = Vec::new();
        write_request(&mut buf, 7).unwrap();

        let frame = read_frame(&mut Cursor::new(buf)).unwrap();
        assert_eq!(frame, Some(Frame::Request { worker: 7 }));
    }

    #[test]
    fn test_result_round_trip() {
        let chunk = Chunk {
            worker: 3,
            offset: 16384,
            elapsed: 0.001625,
            payload: b"first line\nsecond line\n".to_vec(),
        };
        let mut buf = Vec::new();
        write_result(&mut buf, &chunk).unwrap();

        let frame = read_frame(&mut Cursor::new(buf)).unwrap();
        assert_eq!(frame, Some(Frame::Result(chunk)));
    }

    #[test]
    fn test_assignment_round_trip() {
        let range = FileRange {
            offset: 8192,
            len: 4096,
        };
        let mut buf = Vec::new();
        write_assignment(&mut buf, Assignment::Range(range)).unwrap();
        write_assignment(&mut buf, Assignment::Stop).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_assignment(&mut cursor).unwrap(), Assignment::Range(range));
        assert_eq!(read_assignment(&mut cursor).unwrap(), Assignment::Stop);
    }

    #[test]
    fn test_clean_eof_at_frame_boundary() {
        let frame = read_frame(&mut Cursor::new(Vec::new())).unwrap();
        assert!(frame.is_none());
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut buf = Vec::new();
        write_request(&mut buf, 1).unwrap();
        buf.truncate(6);

        assert!(read_frame(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let chunk = Chunk {
            worker: 0,
            offset: 0,
            elapsed: 0.0,
            payload: b"payload bytes\n".to_vec(),
        };
        let mut buf = Vec::new();
        write_result(&mut buf, &chunk).unwrap();
        buf.truncate(buf.len() - 4);

        assert!(read_frame(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let buf = 99u32.to_le_bytes().to_vec();
        match read_frame(&mut Cursor::new(buf)) {
            Err(ScanError::Protocol(msg)) => assert!(msg.contains("unknown message tag")),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_payload_length_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&TAG_RESULT.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&(CHUNK_SIZE as u64 + 1).to_le_bytes());
        buf.extend_from_slice(&0f64.to_le_bytes());

        match read_frame(&mut Cursor::new(buf)) {
            Err(ScanError::Protocol(msg)) => assert!(msg.contains("chunk size")),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }
}

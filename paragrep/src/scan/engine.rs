//! Coordinator side of the scan pipeline.
//!
//! The coordinator spawns the worker pool as child processes of its own
//! executable, then runs a single-threaded event loop. One reader thread per
//! child decodes frames off that child's stdout and funnels them into a
//! bounded channel; blocking on `recv()` is the coordinator's only
//! suspension point, standing in for a `select` over the result pipes. The
//! reader threads also guarantee every child's stdout keeps draining while
//! the coordinator is busy elsewhere, so a worker can never wedge mid-frame.
//!
//! Requests are answered through the dispatcher (range or a once-per-worker
//! stop); results pass through the reorder buffer and are stitched, logged,
//! and counted strictly in file order.

use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use tracing::{debug, info};

use crate::chunk_log::ChunkLog;
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::protocol::{self, Assignment, Frame};
use crate::scan::dispatcher::Dispatcher;
use crate::scan::matcher::ParagraphMatcher;
use crate::scan::reorder::ReorderBuffer;
use crate::scan::stitcher::Stitcher;

/// Hidden subcommand the coordinator re-invokes its own executable with.
pub const WORKER_SUBCOMMAND: &str = "__worker";

/// Totals for a completed scan, reported once the last chunk is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Chunks released through the reorder buffer (= log rows).
    pub chunks: u64,
    /// Bytes covered by released chunks.
    pub bytes: u64,
    /// Matched paragraphs, the trailing flush included.
    pub paragraphs_matched: u64,
}

/// One decoded occurrence on a worker pipe, tagged with the pipe it came
/// from.
enum Event {
    Frame { worker: u32, frame: Frame },
    Closed { worker: u32 },
    Failed { worker: u32, error: ScanError },
}

/// Scans the configured file, printing matching paragraphs to stdout.
pub fn scan(config: &ScanConfig) -> ScanResult<ScanSummary> {
    let stdout = io::stdout();
    scan_with_output(config, stdout.lock())
}

/// Scans the configured file, printing matching paragraphs to `out`.
pub fn scan_with_output(config: &ScanConfig, out: impl Write) -> ScanResult<ScanSummary> {
    let matcher = ParagraphMatcher::new(&config.pattern)?;
    let mut log = ChunkLog::create(&config.log_path)?;
    let mut dispatcher = Dispatcher::new(std::fs::File::open(&config.file)?);
    let mut stitcher = Stitcher::new(matcher, out);

    let workers = config.workers.get();
    info!(
        workers,
        file = %config.file.display(),
        "starting scan"
    );

    let mut pool = spawn_workers(config, workers)?;

    let (event_tx, event_rx) = bounded::<Event>(workers * 2);
    let mut readers = Vec::with_capacity(workers);
    for (id, stdout) in pool.stdouts.drain(..).enumerate() {
        readers.push(spawn_reader(id as u32, stdout, event_tx.clone())?);
    }
    drop(event_tx);

    let mut reorder = ReorderBuffer::new();
    let mut stop_sent = vec![false; workers];
    let mut finished = 0usize;
    let mut next_to_process = 0u64;
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    while finished < workers {
        let event = match event_rx.recv() {
            Ok(event) => event,
            Err(_) => break,
        };

        match event {
            Event::Frame {
                worker,
                frame: Frame::Request { worker: requested },
            } => {
                if requested != worker {
                    return Err(ScanError::protocol_error(format!(
                        "request from worker {requested} arrived on pipe {worker}"
                    )));
                }
                match dispatcher.next_range()? {
                    Some(range) => {
                        debug!(worker, offset = range.offset, len = range.len, "assigned");
                        protocol::write_assignment(
                            &mut pool.stdins[worker as usize],
                            Assignment::Range(range),
                        )?;
                    }
                    None => {
                        if !stop_sent[worker as usize] {
                            debug!(worker, "stopping");
                            protocol::write_assignment(
                                &mut pool.stdins[worker as usize],
                                Assignment::Stop,
                            )?;
                            stop_sent[worker as usize] = true;
                        }
                    }
                }
            }
            Event::Frame {
                worker,
                frame: Frame::Result(chunk),
            } => {
                if chunk.worker != worker {
                    return Err(ScanError::protocol_error(format!(
                        "result from worker {} arrived on pipe {worker}",
                        chunk.worker
                    )));
                }
                reorder.insert(chunk)?;
                while let Some(ready) = reorder.pop_if(next_to_process) {
                    let found = stitcher.absorb(&ready.payload)?;
                    log.record(&ready, found)?;
                    next_to_process += ready.len();
                    chunks += 1;
                    bytes += ready.len();
                }
            }
            Event::Closed { worker } => {
                debug!(worker, "pipe closed");
                finished += 1;
            }
            Event::Failed { worker, error } => {
                debug!(worker, "pipe failed");
                return Err(error);
            }
        }
    }

    let complete = reorder.is_empty() && next_to_process == dispatcher.next_offset();
    if complete {
        stitcher.finish()?;
    }

    drop(pool.stdins);
    reap(pool.children)?;
    for reader in readers {
        let _ = reader.join();
    }

    if !complete {
        return Err(ScanError::protocol_error(format!(
            "workers stopped with {} of {} assigned bytes unprocessed",
            dispatcher.next_offset() - next_to_process,
            dispatcher.next_offset()
        )));
    }

    let summary = ScanSummary {
        chunks,
        bytes,
        paragraphs_matched: stitcher.paragraphs_matched(),
    };
    info!(
        chunks = summary.chunks,
        bytes = summary.bytes,
        matched = summary.paragraphs_matched,
        "scan complete"
    );
    Ok(summary)
}

struct WorkerPool {
    children: Vec<Child>,
    stdins: Vec<ChildStdin>,
    stdouts: Vec<ChildStdout>,
}

/// Collects every worker; a non-success exit status fails the run.
fn reap(children: Vec<Child>) -> ScanResult<()> {
    for (id, mut child) in children.into_iter().enumerate() {
        let status = child.wait()?;
        if !status.success() {
            return Err(ScanError::Worker {
                id: id as u32,
                status,
            });
        }
    }
    Ok(())
}

/// Spawns the worker processes with piped stdin/stdout; stderr is inherited
/// so worker diagnostics reach the run's stderr.
fn spawn_workers(config: &ScanConfig, workers: usize) -> ScanResult<WorkerPool> {
    let exe: PathBuf = match &config.worker_exe {
        Some(exe) => exe.clone(),
        None => std::env::current_exe()?,
    };

    let mut pool = WorkerPool {
        children: Vec::with_capacity(workers),
        stdins: Vec::with_capacity(workers),
        stdouts: Vec::with_capacity(workers),
    };

    for id in 0..workers {
        let mut child = Command::new(&exe)
            .arg(WORKER_SUBCOMMAND)
            .arg("--id")
            .arg(id.to_string())
            .arg("--file")
            .arg(&config.file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScanError::protocol_error("worker spawned without stdin pipe"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScanError::protocol_error("worker spawned without stdout pipe"))?;
        pool.children.push(child);
        pool.stdins.push(stdin);
        pool.stdouts.push(stdout);
    }
    Ok(pool)
}

/// Decodes frames off one worker pipe until it closes or fails. The final
/// event for a pipe is always `Closed` or `Failed`, and it follows every
/// frame that worker produced.
fn spawn_reader(
    worker: u32,
    stdout: ChildStdout,
    events: Sender<Event>,
) -> io::Result<thread::JoinHandle<()>> {
    let mut stdout = BufReader::new(stdout);
    thread::Builder::new()
        .name(format!("paragrep-reader-{worker}"))
        .spawn(move || loop {
            match protocol::read_frame(&mut stdout) {
                Ok(Some(frame)) => {
                    if events.send(Event::Frame { worker, frame }).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = events.send(Event::Closed { worker });
                    break;
                }
                Err(error) => {
                    let _ = events.send(Event::Failed { worker, error });
                    break;
                }
            }
        })
}

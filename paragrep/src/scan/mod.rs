//! The ordered-reassembly pipeline: dispatch, reorder, stitch, match.
//!
//! Work flows dispatcher → workers → reorder buffer → stitcher. The
//! dispatcher assigns byte ranges on demand rather than pre-partitioning the
//! file, so fast workers simply pull more chunks; the reorder buffer puts
//! out-of-order arrivals back into file order; the stitcher restores
//! paragraphs across chunk boundaries and applies the boundary-wrapped
//! pattern exactly once per paragraph.

pub mod dispatcher;
pub mod engine;
pub mod matcher;
pub mod reorder;
pub mod stitcher;

pub use engine::{scan, scan_with_output, ScanSummary, WORKER_SUBCOMMAND};
pub use matcher::ParagraphMatcher;

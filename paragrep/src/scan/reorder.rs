use std::collections::BTreeMap;

use crate::chunk::Chunk;
use crate::errors::{ScanError, ScanResult};

/// Holds chunks that arrived ahead of their turn and releases them in
/// strictly ascending file-offset order.
///
/// Between pops the buffer can hold at most `num_workers - 1` chunks ahead
/// of the expected offset, since each worker has one result in flight.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    pending: BTreeMap<u64, Chunk>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an arrived chunk. Two chunks for the same offset mean a
    /// worker or the dispatcher misbehaved, so the run fails.
    pub fn insert(&mut self, chunk: Chunk) -> ScanResult<()> {
        let offset = chunk.offset;
        if self.pending.insert(offset, chunk).is_some() {
            return Err(ScanError::protocol_error(format!(
                "duplicate chunk for offset {offset}"
            )));
        }
        Ok(())
    }

    /// Removes and returns the head chunk iff its offset is exactly
    /// `expected`.
    pub fn pop_if(&mut self, expected: u64) -> Option<Chunk> {
        match self.pending.first_key_value() {
            Some((&offset, _)) if offset == expected => self.pending.remove(&expected),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

//! In-memory chunk store.
//!
//! Owns every [`Chunk`] for the lifetime of the engine. Chunk ids are
//! unique across the store; removing a chunk is the caller's signal to
//! drop the dependent vector and lexical entries as well (the hybrid
//! engine performs that cascade under a single writer lock).

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId};

#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: BTreeMap<ChunkId, Chunk>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk, failing with [`Error::DuplicateId`] if the id is
    /// already present.
    pub fn insert(&mut self, chunk: Chunk) -> Result<ChunkId> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(Error::DuplicateId(chunk.id));
        }
        let id = chunk.id.clone();
        self.chunks.insert(id.clone(), chunk);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<&Chunk> {
        self.chunks.get(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Remove a chunk, returning it. Fails with [`Error::NotFound`] for
    /// unknown ids.
    pub fn remove(&mut self, id: &str) -> Result<Chunk> {
        self.chunks.remove(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate chunks in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

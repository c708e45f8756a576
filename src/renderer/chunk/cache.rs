use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::{Chunk, ChunkKey, ChunkPayload};

new_key_type! {
    /// Generation-checked handle to a cached chunk.
    pub struct ChunkHandle;
}

/// Reference-counted chunk storage keyed by [`ChunkKey`].
///
/// Structurally identical bindings across objects share one chunk. A chunk is
/// dropped when its last holder releases it; stale handles resolve to `None`.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: SlotMap<ChunkHandle, Chunk>,
    lookup: FxHashMap<ChunkKey, ChunkHandle>,
}

impl ChunkCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference to the chunk for `key`, building it on first use.
    pub fn acquire(&mut self, key: ChunkKey, build: impl FnOnce() -> ChunkPayload) -> ChunkHandle {
        if let Some(&handle) = self.lookup.get(&key) {
            if let Some(chunk) = self.chunks.get_mut(handle) {
                chunk.ref_count += 1;
                return handle;
            }
        }

        let handle = self.chunks.insert(Chunk {
            key,
            payload: build(),
            ref_count: 1,
        });
        self.lookup.insert(key, handle);
        log::trace!("Created {} chunk {key}", key.kind.name());
        handle
    }

    /// Drops one reference; frees the chunk when none remain.
    pub fn release(&mut self, handle: ChunkHandle) {
        let Some(chunk) = self.chunks.get_mut(handle) else {
            log::warn!("Released stale chunk handle {handle:?}");
            return;
        };
        chunk.ref_count = chunk.ref_count.saturating_sub(1);
        if chunk.ref_count == 0 {
            if let Some(chunk) = self.chunks.remove(handle) {
                self.lookup.remove(&chunk.key);
                log::trace!("Destroyed {} chunk {}", chunk.key.kind.name(), chunk.key);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: ChunkHandle) -> Option<&Chunk> {
        self.chunks.get(handle)
    }

    #[must_use]
    pub fn find(&self, key: &ChunkKey) -> Option<ChunkHandle> {
        self.lookup.get(key).copied()
    }

    /// Reference count of the chunk for `key`, zero if it is not cached.
    #[must_use]
    pub fn ref_count(&self, key: &ChunkKey) -> u32 {
        self.find(key)
            .and_then(|handle| self.chunks.get(handle))
            .map_or(0, Chunk::ref_count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

//! Program Cache
//!
//! Central owner of every GPU program. Programs are stored in a contiguous
//! `Vec` addressed through lightweight [`ProgramId`] handles and deduplicated
//! by their structured [`ProgramKey`].
//!
//! # Reference Counting
//!
//! Objects with identical shader requirements share one program. Each object
//! holding a program calls [`ProgramCache::acquire`] once and
//! [`ProgramCache::release`] once; the GPU variants are destroyed when the
//! count reaches zero and the slot index is recycled.
//!
//! # Variants
//!
//! Every entry owns a draw variant and a pick variant, both built from the same
//! [`ShaderCores`] snapshot. The snapshot is retained so
//! [`ProgramCache::restore`] can rebuild both variants after a context loss.

use rustc_hash::FxHashMap;

use crate::errors::{DisplayError, Result};
use crate::renderer::device::{GpuDevice, GpuProgram};
use crate::renderer::pipeline::program_id::ProgramId;
use crate::renderer::pipeline::program_key::{ProgramDescriptor, ProgramKey, ProgramMode};
use crate::scene::ShaderCores;

/// One cached program.
#[derive(Debug)]
pub struct ProgramEntry {
    pub key: ProgramKey,
    pub cores: ShaderCores,
    pub draw: GpuProgram,
    pub pick: GpuProgram,
    ref_count: u32,
}

impl ProgramEntry {
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    #[inline]
    #[must_use]
    pub fn variant(&self, mode: ProgramMode) -> GpuProgram {
        match mode {
            ProgramMode::Draw => self.draw,
            ProgramMode::Pick => self.pick,
        }
    }
}

/// Reference-counted program storage.
#[derive(Debug, Default)]
pub struct ProgramCache {
    // ---- Storage (contiguous, indexed by Id) ----
    entries: Vec<Option<ProgramEntry>>,
    free: Vec<u32>,

    // ---- Canonical lookup (key → Id) ----
    lookup: FxHashMap<ProgramKey, ProgramId>,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(32),
            free: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    // ── Retrieval ────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn get(&self, id: ProgramId) -> Option<&ProgramEntry> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn find(&self, key: &ProgramKey) -> Option<ProgramId> {
        self.lookup.get(key).copied()
    }

    /// Reference count of `id`, zero if it is not live.
    #[must_use]
    pub fn ref_count(&self, id: ProgramId) -> u32 {
        self.get(id).map_or(0, ProgramEntry::ref_count)
    }

    /// Number of live programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    // ── Acquire / Release ────────────────────────────────────────────────────

    /// Returns the shared program for `cores`, creating it on first use.
    ///
    /// On failure nothing is registered and no reference is taken.
    pub fn acquire(&mut self, device: &mut dyn GpuDevice, cores: &ShaderCores) -> Result<ProgramId> {
        let key = ProgramKey::from_cores(cores);
        if let Some(id) = self.lookup.get(&key).copied() {
            if let Some(entry) = self.entries.get_mut(id.index()).and_then(Option::as_mut) {
                entry.ref_count += 1;
                return Ok(id);
            }
        }

        let (draw, pick) = Self::build_variants(device, &key, cores)?;
        let entry = ProgramEntry {
            key,
            cores: cores.clone(),
            draw,
            pick,
            ref_count: 1,
        };

        let id = if let Some(index) = self.free.pop() {
            self.entries[index as usize] = Some(entry);
            ProgramId(index)
        } else {
            self.entries.push(Some(entry));
            ProgramId((self.entries.len() - 1) as u32)
        };
        self.lookup.insert(key, id);
        log::debug!("Created {key} as program {id}");
        Ok(id)
    }

    /// Drops one reference; destroys the program when none remain.
    pub fn release(&mut self, device: &mut dyn GpuDevice, id: ProgramId) {
        let Some(slot) = self.entries.get_mut(id.index()) else {
            log::warn!("Released unknown program {id}");
            return;
        };
        let Some(entry) = slot.as_mut() else {
            log::warn!("Released dead program {id}");
            return;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return;
        }

        if let Some(entry) = slot.take() {
            device.destroy_program(entry.draw);
            device.destroy_program(entry.pick);
            self.lookup.remove(&entry.key);
            self.free.push(id.0);
            log::debug!("Destroyed program {id} ({})", entry.key);
        }
    }

    // ── Context Loss ─────────────────────────────────────────────────────────

    /// Rebuilds every live program on a fresh context.
    ///
    /// Handles from the lost context are not destroyed. Ids and reference
    /// counts are preserved, so render objects stay valid.
    pub fn restore(&mut self, device: &mut dyn GpuDevice) -> Result<()> {
        for entry in self.entries.iter_mut().flatten() {
            let (draw, pick) = Self::build_variants(device, &entry.key, &entry.cores)?;
            entry.draw = draw;
            entry.pick = pick;
        }
        log::info!("Restored {} programs", self.lookup.len());
        Ok(())
    }

    fn build_variants(
        device: &mut dyn GpuDevice,
        key: &ProgramKey,
        cores: &ShaderCores,
    ) -> Result<(GpuProgram, GpuProgram)> {
        let draw = Self::build_variant(device, key, ProgramMode::Draw, cores)?;
        match Self::build_variant(device, key, ProgramMode::Pick, cores) {
            Ok(pick) => Ok((draw, pick)),
            Err(err) => {
                device.destroy_program(draw);
                Err(err)
            }
        }
    }

    fn build_variant(
        device: &mut dyn GpuDevice,
        key: &ProgramKey,
        mode: ProgramMode,
        cores: &ShaderCores,
    ) -> Result<GpuProgram> {
        device
            .create_program(&ProgramDescriptor { key, mode, cores })
            .map_err(|reason| DisplayError::ProgramCreationFailed {
                key: key.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::RecordingDevice;
    use crate::scene::{CoreRef, Light, LightsCore};
    use glam::Vec3;

    fn lit() -> ShaderCores {
        ShaderCores {
            lights: CoreRef::new(LightsCore::new([Light::ambient(Vec3::ONE)])),
            ..ShaderCores::default()
        }
    }

    #[test]
    fn test_identical_keys_share_program() {
        let mut device = RecordingDevice::new(8, 8);
        let mut cache = ProgramCache::new();
        let a = cache.acquire(&mut device, &lit()).unwrap();
        let b = cache.acquire(&mut device, &lit()).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.ref_count(a), 2);
        assert_eq!(device.live_programs(), 2);
    }

    #[test]
    fn test_release_destroys_at_zero() {
        let mut device = RecordingDevice::new(8, 8);
        let mut cache = ProgramCache::new();
        let id = cache.acquire(&mut device, &lit()).unwrap();
        cache.acquire(&mut device, &lit()).unwrap();

        cache.release(&mut device, id);
        assert_eq!(device.live_programs(), 2);
        cache.release(&mut device, id);
        assert_eq!(device.live_programs(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_released_index_is_recycled() {
        let mut device = RecordingDevice::new(8, 8);
        let mut cache = ProgramCache::new();
        let first = cache.acquire(&mut device, &lit()).unwrap();
        cache.release(&mut device, first);
        let second = cache.acquire(&mut device, &ShaderCores::default()).unwrap();
        assert_eq!(first.index(), second.index());
    }

    #[test]
    fn test_failed_creation_registers_nothing() {
        let mut device = RecordingDevice::new(8, 8);
        device.fail_program_creation(true);
        let mut cache = ProgramCache::new();
        let err = cache.acquire(&mut device, &lit()).unwrap_err();
        assert!(matches!(err, DisplayError::ProgramCreationFailed { .. }));
        assert!(cache.is_empty());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_restore_rebuilds_variants() {
        let mut device = RecordingDevice::new(8, 8);
        let mut cache = ProgramCache::new();
        let id = cache.acquire(&mut device, &lit()).unwrap();
        let before = cache.get(id).unwrap().draw;
        cache.restore(&mut device).unwrap();
        let entry = cache.get(id).unwrap();
        assert_ne!(entry.draw, before);
        assert_eq!(entry.ref_count(), 1);
    }
}

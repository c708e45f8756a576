//! State Sort Key
//!
//! A packed 64-bit key totally ordering render objects so the executor changes
//! the most expensive GPU state least often. Ascending order is draw order.
//!
//! # Layout
//!
//! ```text
//! | 63-62 | 61-50 (12)  | 49-48 (2)   | 47-32 (16)  | 31-16 (16) | 15-0 (16)    |
//! | zero  | Stage+2048  | Transparent | Layer+32768 | Program+1  | Texture slot |
//! ```
//!
//! - **Stage**: signed priority biased to the middle of the field; higher
//!   priority draws later.
//! - **Transparency bucket**: 1 for opaque, 2 for transparent.
//! - **Layer**: signed priority biased like the stage.
//! - **Program** (id + 1): groups objects sharing a program.
//! - **Texture**: dense slot from [`TextureSlots`], 0 without a texture.
//!
//! Objects without a program get [`StateSortKey::UNBOUND`] (zero), which sorts
//! before every bound object. Bound keys are never zero because the
//! transparency bucket is at least 1. Components outside their field are
//! handled according to [`SortKeyOverflow`].

use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

use crate::renderer::pipeline::ProgramId;
use crate::renderer::settings::SortKeyOverflow;
use crate::scene::StateId;

const STAGE_BITS: u32 = 12;
const TRANSPARENT_BITS: u32 = 2;
const LAYER_BITS: u32 = 16;
const PROGRAM_BITS: u32 = 16;
const TEXTURE_BITS: u32 = 16;

const TEXTURE_SHIFT: u32 = 0;
const PROGRAM_SHIFT: u32 = TEXTURE_SHIFT + TEXTURE_BITS;
const LAYER_SHIFT: u32 = PROGRAM_SHIFT + PROGRAM_BITS;
const TRANSPARENT_SHIFT: u32 = LAYER_SHIFT + LAYER_BITS;
const STAGE_SHIFT: u32 = TRANSPARENT_SHIFT + TRANSPARENT_BITS;

const STAGE_BIAS: i64 = 1 << (STAGE_BITS - 1);
const LAYER_BIAS: i64 = 1 << (LAYER_BITS - 1);

const fn field_max(bits: u32) -> u64 {
    (1 << bits) - 1
}

/// Packed per-object ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StateSortKey(pub u64);

/// Unpacked inputs of a [`StateSortKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortKeyFields {
    pub stage_priority: i32,
    pub transparent: bool,
    pub layer_priority: i32,
    pub program: Option<ProgramId>,
    /// Slot assigned by [`TextureSlots`], not the texture's state id.
    pub texture_slot: Option<u32>,
}

#[derive(Clone, Copy)]
enum Field {
    Stage,
    Layer,
    Program,
    Texture,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Layer => "layer",
            Self::Program => "program",
            Self::Texture => "texture",
        }
    }

    fn warned(self) -> &'static AtomicBool {
        static WARNED: [AtomicBool; 4] = [
            AtomicBool::new(false),
            AtomicBool::new(false),
            AtomicBool::new(false),
            AtomicBool::new(false),
        ];
        &WARNED[self as usize]
    }
}

impl StateSortKey {
    /// Key of objects without a bound program.
    pub const UNBOUND: Self = Self(0);

    /// Packs `fields`; returns [`StateSortKey::UNBOUND`] without a program.
    #[must_use]
    pub fn compute(fields: &SortKeyFields, overflow: SortKeyOverflow) -> Self {
        let Some(program) = fields.program else {
            return Self::UNBOUND;
        };

        let parts = [
            (
                Field::Stage,
                i64::from(fields.stage_priority) + STAGE_BIAS,
                STAGE_BITS,
            ),
            (
                Field::Layer,
                i64::from(fields.layer_priority) + LAYER_BIAS,
                LAYER_BITS,
            ),
            (Field::Program, i64::from(program.raw()) + 1, PROGRAM_BITS),
            (
                Field::Texture,
                fields.texture_slot.map_or(0, i64::from),
                TEXTURE_BITS,
            ),
        ];

        let mut packed = [0u64; 4];
        for (slot, (field, value, bits)) in packed.iter_mut().zip(parts) {
            let max = field_max(bits);
            if let Ok(value) = u64::try_from(value)
                && value <= max
            {
                *slot = value;
                continue;
            }
            if !field.warned().swap(true, Ordering::Relaxed) {
                log::warn!(
                    "Sort key {} component {value} outside {bits}-bit field ({overflow:?})",
                    field.name()
                );
            }
            match overflow {
                SortKeyOverflow::Saturate => *slot = if value < 0 { 0 } else { max },
                SortKeyOverflow::Reject => return Self::UNBOUND,
            }
        }

        let [stage, layer, program, texture] = packed;
        let transparency: u64 = if fields.transparent { 2 } else { 1 };

        Self(
            (stage << STAGE_SHIFT)
                | (transparency << TRANSPARENT_SHIFT)
                | (layer << LAYER_SHIFT)
                | (program << PROGRAM_SHIFT)
                | (texture << TEXTURE_SHIFT),
        )
    }

    #[inline]
    #[must_use]
    pub fn is_unbound(self) -> bool {
        self == Self::UNBOUND
    }

    /// Stage priority as stored in the key (after saturation).
    #[inline]
    #[must_use]
    pub fn stage(self) -> i64 {
        i64::from(((self.0 >> STAGE_SHIFT) & field_max(STAGE_BITS)) as u16) - STAGE_BIAS
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(self) -> bool {
        (self.0 >> TRANSPARENT_SHIFT) & field_max(TRANSPARENT_BITS) == 2
    }

    /// Layer priority as stored in the key (after saturation).
    #[inline]
    #[must_use]
    pub fn layer(self) -> i64 {
        i64::from(((self.0 >> LAYER_SHIFT) & field_max(LAYER_BITS)) as u16) - LAYER_BIAS
    }

    /// Program id + 1 as stored in the key.
    #[inline]
    #[must_use]
    pub fn program(self) -> u64 {
        (self.0 >> PROGRAM_SHIFT) & field_max(PROGRAM_BITS)
    }

    /// Texture slot, 0 without a texture.
    #[inline]
    #[must_use]
    pub fn texture(self) -> u64 {
        (self.0 >> TEXTURE_SHIFT) & field_max(TEXTURE_BITS)
    }
}

// ─── Texture Slots ───────────────────────────────────────────────────────────

/// Small reference-counted slot numbers for live texture cores.
///
/// The texture field of a [`StateSortKey`] holds a slot from this table
/// rather than the core's [`StateId`]. Slots start at 1 and a slot is reused
/// once every object holding its texture core let go of it, so the field only
/// overflows with more than 65 535 textures alive at once.
#[derive(Debug, Default)]
pub struct TextureSlots {
    /// `texture -> (slot, holders)`
    slots: FxHashMap<StateId, (u32, u32)>,
    free: Vec<u32>,
    next: u32,
}

impl TextureSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more holder of `texture` and returns its slot.
    pub fn acquire(&mut self, texture: StateId) -> u32 {
        match self.slots.entry(texture) {
            Entry::Occupied(mut entry) => {
                let (slot, holders) = entry.get_mut();
                *holders += 1;
                *slot
            }
            Entry::Vacant(entry) => {
                let slot = self.free.pop().unwrap_or_else(|| {
                    self.next += 1;
                    self.next
                });
                entry.insert((slot, 1));
                slot
            }
        }
    }

    /// Drops one holder of `texture`, freeing its slot with the last one.
    pub fn release(&mut self, texture: StateId) {
        let Entry::Occupied(mut entry) = self.slots.entry(texture) else {
            log::warn!("TextureSlots: release of untracked texture {texture}");
            return;
        };
        let (slot, holders) = entry.get_mut();
        *holders -= 1;
        if *holders == 0 {
            self.free.push(*slot);
            entry.remove();
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, texture: StateId) -> Option<u32> {
        self.slots.get(&texture).map(|&(slot, _)| slot)
    }

    /// Number of live texture cores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

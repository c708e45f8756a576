//! Dirty-flag cascade.
//!
//! Stages run in a fixed order; each flag implies every flag after it:
//!
//! ```text
//! OBJECT_LIST ⊇ STATE_ORDER ⊇ STATE_SORT ⊇ DRAW_LIST ⊇ IMAGE
//! ```
//!
//! Flags are only ever set through [`DirtyFlags::cascade`], and cleared one
//! stage at a time by the stage that consumed them.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        /// The live object list must be rebuilt from the registry.
        const OBJECT_LIST = 1 << 0;
        /// Sort keys must be recomputed.
        const STATE_ORDER = 1 << 1;
        /// The object list must be re-sorted.
        const STATE_SORT  = 1 << 2;
        /// Draw and pick lists must be rebuilt.
        const DRAW_LIST   = 1 << 3;
        /// The image list must be executed.
        const IMAGE       = 1 << 4;
    }
}

impl DirtyFlags {
    /// `stage` plus every stage downstream of it.
    ///
    /// For a multi-bit argument the most upstream stage wins.
    #[inline]
    #[must_use]
    pub fn cascade(stage: Self) -> Self {
        let bits = stage.bits();
        if bits == 0 {
            return Self::empty();
        }
        let lowest = bits & bits.wrapping_neg();
        Self::from_bits_truncate(!(lowest - 1))
    }

    /// Marks `stage` and everything downstream.
    #[inline]
    pub fn escalate(&mut self, stage: Self) {
        self.insert(Self::cascade(stage));
    }

    /// Clears `stage` after it ran; returns whether it was set.
    #[inline]
    pub fn consume(&mut self, stage: Self) -> bool {
        let was_set = self.contains(stage);
        self.remove(stage);
        was_set
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_from_object_list_sets_everything() {
        assert_eq!(DirtyFlags::cascade(DirtyFlags::OBJECT_LIST), DirtyFlags::all());
    }

    #[test]
    fn test_cascade_from_draw_list() {
        assert_eq!(
            DirtyFlags::cascade(DirtyFlags::DRAW_LIST),
            DirtyFlags::DRAW_LIST | DirtyFlags::IMAGE
        );
    }

    #[test]
    fn test_cascade_of_image_is_image() {
        assert_eq!(DirtyFlags::cascade(DirtyFlags::IMAGE), DirtyFlags::IMAGE);
    }

    #[test]
    fn test_consume_clears_single_stage() {
        let mut flags = DirtyFlags::empty();
        flags.escalate(DirtyFlags::STATE_ORDER);
        assert!(flags.consume(DirtyFlags::STATE_ORDER));
        assert!(!flags.contains(DirtyFlags::STATE_ORDER));
        assert!(flags.contains(DirtyFlags::STATE_SORT | DirtyFlags::DRAW_LIST | DirtyFlags::IMAGE));
        assert!(!flags.consume(DirtyFlags::STATE_ORDER));
    }
}

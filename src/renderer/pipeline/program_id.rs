//! Strongly-typed program handle.
//!
//! Thin `Copy` wrapper around a `u32` index into the [`ProgramCache`] storage
//! array. Indices of released programs are recycled.
//!
//! [`ProgramCache`]: super::cache::ProgramCache

use std::fmt;

/// Handle to a cached [`Program`](super::cache::ProgramEntry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

impl ProgramId {
    /// Raw index into the program storage array.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

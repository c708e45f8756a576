//! State identities and core references.
//!
//! Every state core handed to the scheduler carries a [`StateId`]. Cores that
//! influence generated shader code additionally expose a [`ShaderHash`]
//! summarizing *only* the shader-relevant part of their configuration.
//!
//! Slots are resolved through [`CoreRef`], so every slot lookup is a total
//! match over three cases:
//!
//! | Variant      | Meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `Absent`     | The scene defines no core of this kind for the node  |
//! | `Empty`      | A core exists but is a no-op for its slot            |
//! | `Present(c)` | A live core that must be bound                       |

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use xxhash_rust::xxh3::xxh3_64;

static NEXT_STATE_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of one version of a state core.
///
/// Compared as a plain integer, never coerced through strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    /// Allocates a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of the shader-relevant subset of a core's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHash(pub u64);

impl ShaderHash {
    /// Hashes a canonical descriptor string (e.g. `"clips:2:inside,outside"`).
    #[inline]
    #[must_use]
    pub fn of_descriptor(descriptor: &str) -> Self {
        Self(xxh3_64(descriptor.as_bytes()))
    }
}

/// Common interface of every state core consumed by the scheduler.
pub trait StateCore: fmt::Debug + Send + Sync {
    /// Identity used in chunk keys and sort keys.
    fn state_id(&self) -> StateId;

    /// Shader-relevant hash, `None` for cores that never affect shader text.
    fn shader_hash(&self) -> Option<ShaderHash> {
        None
    }
}

/// Reference to the currently active core of one kind.
pub enum CoreRef<T> {
    /// No core of this kind is active.
    Absent,
    /// The active core is a no-op for its slot.
    Empty,
    /// A live core.
    Present(Arc<T>),
}

impl<T> CoreRef<T> {
    #[inline]
    #[must_use]
    pub fn present(&self) -> Option<&Arc<T>> {
        match self {
            Self::Present(core) => Some(core),
            Self::Absent | Self::Empty => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl<T: StateCore> CoreRef<T> {
    /// Id of the present core, if any.
    #[inline]
    #[must_use]
    pub fn state_id(&self) -> Option<StateId> {
        self.present().map(|core| core.state_id())
    }

    /// Shader hash of the present core, if any.
    #[inline]
    #[must_use]
    pub fn shader_hash(&self) -> Option<ShaderHash> {
        self.present().and_then(|core| core.shader_hash())
    }
}

impl<T> Default for CoreRef<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Clone for CoreRef<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Empty => Self::Empty,
            Self::Present(core) => Self::Present(Arc::clone(core)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CoreRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Empty => f.write_str("Empty"),
            Self::Present(core) => f.debug_tuple("Present").field(core).finish(),
        }
    }
}

impl<T> From<Arc<T>> for CoreRef<T> {
    fn from(core: Arc<T>) -> Self {
        Self::Present(core)
    }
}

impl<T> CoreRef<T> {
    /// Wraps a freshly built core.
    #[must_use]
    pub fn new(core: T) -> Self {
        Self::Present(Arc::new(core))
    }
}

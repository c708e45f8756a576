//! Render objects and their registry.
//!
//! A [`RenderObject`] is the scheduler's unit of work: references to the cores
//! that drive culling and ordering, the shader key and program it compiled to,
//! and one chunk slot per [`ChunkKind`].
//!
//! Removed objects return to a pool with their slots cleared, so recompiling
//! after a removal reuses the allocation.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::renderer::chunk::{ChunkHandle, ChunkKey, ChunkKind, SLOT_COUNT};
use crate::renderer::pipeline::{ProgramId, ProgramKey};
use crate::renderer::sort_key::StateSortKey;
use crate::scene::{
    CoreRef, EnableCore, FlagsCore, LayerCore, RenderTargetCore, StageCore, TagCore, TextureCore,
};

new_key_type! {
    /// Generation-checked handle into the [`ObjectRegistry`].
    pub struct ObjectKey;
}

/// Host-assigned object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A chunk held by one object slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSlot {
    pub handle: ChunkHandle,
    pub key: ChunkKey,
}

#[derive(Debug, Default)]
pub struct RenderObject {
    pub id: Option<ObjectId>,

    // ─── Culling & Ordering Cores ───
    pub stage: CoreRef<StageCore>,
    pub layer: CoreRef<LayerCore>,
    pub render_target: CoreRef<RenderTargetCore>,
    pub texture: CoreRef<TextureCore>,
    pub enable: CoreRef<EnableCore>,
    pub flags: CoreRef<FlagsCore>,
    pub tag: CoreRef<TagCore>,

    // ─── Derived ───
    pub hash: Option<ProgramKey>,
    pub program: Option<ProgramId>,
    pub sort_key: StateSortKey,
    /// `(selector version, matched)` from the last tag test.
    pub tag_match: Option<(u64, bool)>,

    pub chunks: [Option<ChunkSlot>; SLOT_COUNT],
}

impl RenderObject {
    #[inline]
    #[must_use]
    pub fn chunk(&self, kind: ChunkKind) -> Option<&ChunkSlot> {
        self.chunks[kind.slot()].as_ref()
    }

    /// Whether any visibility switch turns the object off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.enable.present().is_some_and(|core| !core.enabled)
            || self.flags.present().is_some_and(|core| !core.enabled)
            || self.layer.present().is_some_and(|core| !core.enabled)
    }

    /// Stage and per-object flags allow picking, and the object has a name.
    #[must_use]
    pub fn is_pickable(&self) -> bool {
        self.stage.present().is_none_or(|core| core.pickable)
            && self.flags.present().is_none_or(|core| core.picking)
            && self.chunk(ChunkKind::Name).is_some()
    }

    /// Render-target core grouping this object, if it declares any target.
    #[must_use]
    pub fn render_target_group(&self) -> Option<&Arc<RenderTargetCore>> {
        self.render_target
            .present()
            .filter(|core| core.has_targets())
    }

    /// Returns the object to its pooled state. Chunks must already be released.
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Owns every live render object.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: SlotMap<ObjectKey, RenderObject>,
    by_id: FxHashMap<ObjectId, ObjectKey>,
    pool: Vec<RenderObject>,
}

impl ObjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `id`, creating a pooled object if it is unseen.
    ///
    /// The flag reports whether the object was created.
    pub fn get_or_insert(&mut self, id: ObjectId) -> (ObjectKey, &mut RenderObject, bool) {
        if let Some(&key) = self.by_id.get(&id) {
            return (key, &mut self.objects[key], false);
        }
        let mut object = self.pool.pop().unwrap_or_default();
        object.id = Some(id);
        let key = self.objects.insert(object);
        self.by_id.insert(id, key);
        (key, &mut self.objects[key], true)
    }

    #[must_use]
    pub fn key_of(&self, id: ObjectId) -> Option<ObjectKey> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: ObjectKey) -> Option<&RenderObject> {
        self.objects.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut RenderObject> {
        self.objects.get_mut(key)
    }

    #[must_use]
    pub fn find(&self, id: ObjectId) -> Option<&RenderObject> {
        self.key_of(id).and_then(|key| self.objects.get(key))
    }

    /// Unregisters `id` and hands the object back so the caller can release
    /// its chunks and program before [`ObjectRegistry::recycle`].
    pub fn remove(&mut self, id: ObjectId) -> Option<RenderObject> {
        let key = self.by_id.remove(&id)?;
        self.objects.remove(key)
    }

    /// Clears `object` and returns it to the pool.
    pub fn recycle(&mut self, mut object: RenderObject) {
        object.clear();
        self.pool.push(object);
    }

    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.objects.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &RenderObject)> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectKey, &mut RenderObject)> {
        self.objects.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of cleared objects waiting for reuse.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_reports_creation() {
        let mut registry = ObjectRegistry::new();
        let (a, _, created) = registry.get_or_insert(ObjectId(1));
        assert!(created);
        let (b, _, created) = registry.get_or_insert(ObjectId(1));
        assert!(!created);
        assert_eq!(a, b);
    }

    #[test]
    fn test_removed_object_is_pooled_and_reused() {
        let mut registry = ObjectRegistry::new();
        registry.get_or_insert(ObjectId(1));
        let object = registry.remove(ObjectId(1)).unwrap();
        registry.recycle(object);
        assert_eq!(registry.pooled(), 1);
        assert!(registry.is_empty());

        let (key, _, created) = registry.get_or_insert(ObjectId(2));
        assert!(created);
        assert_eq!(registry.pooled(), 0);
        assert_eq!(registry.get(key).and_then(|o| o.id), Some(ObjectId(2)));
    }

    #[test]
    fn test_absent_flags_do_not_disable() {
        let object = RenderObject::default();
        assert!(!object.is_disabled());
    }

    #[test]
    fn test_disabled_layer_culls() {
        let object = RenderObject {
            layer: CoreRef::new(LayerCore::new(0, false)),
            ..RenderObject::default()
        };
        assert!(object.is_disabled());
    }
}

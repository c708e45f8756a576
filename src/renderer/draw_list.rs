//! Draw-List Construction
//!
//! Flattens the state-sorted object list into two command sequences:
//!
//! - the **image list**, executed to draw the frame
//! - the **pick list**, executed into the off-screen pick buffers
//!
//! # Render-Target Grouping
//!
//! Objects whose render-target core declares at least one target are grouped
//! per core, keeping sort order inside each group. Groups are emitted in
//! first-seen order, each preceded by a [`DrawCommand::BindRenderTarget`].
//! A single [`DrawCommand::UnbindRenderTarget`] follows the last group, then
//! the default group is emitted into the pass target. Only the image list
//! carries target commands, so group members stay out of the pick list: they
//! are not visible on the canvas the pick buffers mirror.
//!
//! # Run-Length Dedup
//!
//! Per list, the key last appended at each slot is remembered. A chunk whose
//! key equals the remembered key at its slot is skipped unless its kind is
//! unique. Two adjacent commands at one slot therefore never repeat a
//! non-unique key, while every visible object still contributes its draw
//! call.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::renderer::chunk::{ChunkHandle, ChunkKey, SLOT_COUNT};
use crate::renderer::object::{ObjectKey, ObjectRegistry, RenderObject};
use crate::renderer::tags::TagSelector;
use crate::scene::{RenderTargetCore, StateId};

/// One entry of an image or pick list.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Switch rendering into the targets of a render-target core.
    BindRenderTarget(Arc<RenderTargetCore>),
    /// Return to the pass target.
    UnbindRenderTarget,
    /// Execute a cached chunk.
    Chunk { handle: ChunkHandle, key: ChunkKey },
}

impl DrawCommand {
    #[inline]
    #[must_use]
    pub fn chunk_key(&self) -> Option<&ChunkKey> {
        match self {
            Self::Chunk { key, .. } => Some(key),
            Self::BindRenderTarget(_) | Self::UnbindRenderTarget => None,
        }
    }
}

/// The two command sequences produced per draw-list rebuild.
#[derive(Debug, Default)]
pub struct DrawLists {
    pub image: Vec<DrawCommand>,
    pub pick: Vec<DrawCommand>,
    /// Objects that survived culling in the last build.
    pub visible_objects: usize,
}

struct RenderTargetGroup {
    core: Arc<RenderTargetCore>,
    objects: Vec<ObjectKey>,
}

/// Per-slot run-length state for both lists.
struct Emitter<'a> {
    lists: &'a mut DrawLists,
    last_state: [Option<ChunkKey>; SLOT_COUNT],
    last_pick_state: [Option<ChunkKey>; SLOT_COUNT],
}

impl Emitter<'_> {
    /// Appends `object`'s chunks; `pickable` gates the pick list.
    fn emit(&mut self, object: &RenderObject, pickable: bool) {
        for held in object.chunks.iter().flatten() {
            let kind = held.key.kind;
            let slot = kind.slot();

            if kind.draw() && (kind.unique() || self.last_state[slot] != Some(held.key)) {
                self.lists.image.push(DrawCommand::Chunk {
                    handle: held.handle,
                    key: held.key,
                });
                self.last_state[slot] = Some(held.key);
            }

            if pickable
                && kind.pick()
                && (kind.unique() || self.last_pick_state[slot] != Some(held.key))
            {
                self.lists.pick.push(DrawCommand::Chunk {
                    handle: held.handle,
                    key: held.key,
                });
                self.last_pick_state[slot] = Some(held.key);
            }
        }
        self.lists.visible_objects += 1;
    }
}

/// Rebuilds `lists` from the sorted object order.
///
/// Tag matches are memoized on the objects, hence the mutable registry.
pub fn build_draw_lists(
    order: &[ObjectKey],
    registry: &mut ObjectRegistry,
    tags: &TagSelector,
    lists: &mut DrawLists,
) {
    lists.image.clear();
    lists.pick.clear();
    lists.visible_objects = 0;

    // ── Partition & cull ─────────────────────────────────────────────────────
    let mut groups: Vec<RenderTargetGroup> = Vec::new();
    let mut group_index: FxHashMap<StateId, usize> = FxHashMap::default();
    let mut default_group: Vec<ObjectKey> = Vec::with_capacity(order.len());

    for &key in order {
        let Some(object) = registry.get_mut(key) else {
            continue;
        };
        if object.is_disabled() || !tags.matches(&object.tag, &mut object.tag_match) {
            continue;
        }
        match object.render_target_group() {
            Some(core) => {
                let index = *group_index.entry(core.id).or_insert_with(|| {
                    groups.push(RenderTargetGroup {
                        core: Arc::clone(core),
                        objects: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[index].objects.push(key);
            }
            None => default_group.push(key),
        }
    }

    // ── Emit ─────────────────────────────────────────────────────────────────
    let has_groups = !groups.is_empty();
    let mut emitter = Emitter {
        lists: &mut *lists,
        last_state: [None; SLOT_COUNT],
        last_pick_state: [None; SLOT_COUNT],
    };

    for group in groups {
        emitter
            .lists
            .image
            .push(DrawCommand::BindRenderTarget(group.core));
        for key in group.objects {
            if let Some(object) = registry.get(key) {
                emitter.emit(object, false);
            }
        }
    }
    if has_groups {
        emitter.lists.image.push(DrawCommand::UnbindRenderTarget);
    }

    for key in default_group {
        if let Some(object) = registry.get(key) {
            emitter.emit(object, object.is_pickable());
        }
    }

    log::debug!(
        "Rebuilt draw lists: {} visible objects, {} image commands, {} pick commands",
        lists.visible_objects,
        lists.image.len(),
        lists.pick.len()
    );
}

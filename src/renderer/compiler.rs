//! Chunk Resolution
//!
//! Maps an object's active cores onto its fixed chunk slots. For each slot:
//!
//! 1. `Absent` or `Empty` core: release any chunk held there, leave it empty.
//! 2. Present core: build the slot's [`ChunkKey`]. If the slot already holds
//!    that key nothing happens; otherwise the old chunk is released and the
//!    shared chunk for the new key is acquired from the [`ChunkCache`].

use std::sync::Arc;

use crate::renderer::chunk::{ChunkCache, ChunkKey, ChunkKind, ChunkPayload, SLOT_COUNT};
use crate::renderer::object::{ChunkSlot, RenderObject};
use crate::renderer::pipeline::ProgramId;
use crate::scene::{ActiveCores, CoreRef, StateCore, StateId};

struct SlotResolver<'a> {
    cache: &'a mut ChunkCache,
    slots: &'a mut [Option<ChunkSlot>; SLOT_COUNT],
    program: Option<ProgramId>,
}

impl SlotResolver<'_> {
    fn clear(&mut self, kind: ChunkKind) {
        if let Some(old) = self.slots[kind.slot()].take() {
            self.cache.release(old.handle);
        }
    }

    fn assign(&mut self, key: ChunkKey, build: impl FnOnce() -> ChunkPayload) {
        let slot = &mut self.slots[key.slot()];
        if slot.is_some_and(|held| held.key == key) {
            return;
        }
        if let Some(old) = slot.take() {
            self.cache.release(old.handle);
        }
        let handle = self.cache.acquire(key, build);
        self.slots[key.slot()] = Some(ChunkSlot { handle, key });
    }

    fn program(&mut self) {
        match self.program {
            Some(program) => self.assign(ChunkKey::program(program), || {
                ChunkPayload::Program(program)
            }),
            None => self.clear(ChunkKind::Program),
        }
    }

    fn core<T: StateCore>(
        &mut self,
        kind: ChunkKind,
        core: &CoreRef<T>,
        secondary: Option<StateId>,
        build: impl FnOnce(Arc<T>) -> ChunkPayload,
    ) {
        match core {
            CoreRef::Absent | CoreRef::Empty => self.clear(kind),
            CoreRef::Present(core) => {
                let key = ChunkKey::core(kind, self.program, core.state_id(), secondary);
                self.assign(key, || build(Arc::clone(core)));
            }
        }
    }
}

/// Resolves every chunk slot of `object` against `cores`.
///
/// Uses `object.program` for program-scoped keys, so the program must be
/// settled before this runs.
pub fn compile_chunks(cache: &mut ChunkCache, object: &mut RenderObject, cores: &ActiveCores) {
    let mut r = SlotResolver {
        cache,
        slots: &mut object.chunks,
        program: object.program,
    };

    r.program();
    r.core(ChunkKind::ModelTransform, &cores.model_transform, None, ChunkPayload::ModelTransform);
    r.core(ChunkKind::ViewTransform, &cores.view_transform, None, ChunkPayload::ViewTransform);
    r.core(
        ChunkKind::ProjectionTransform,
        &cores.projection,
        None,
        ChunkPayload::ProjectionTransform,
    );
    r.core(ChunkKind::Flags, &cores.flags, None, ChunkPayload::Flags);
    r.core(ChunkKind::Shader, &cores.shader, None, ChunkPayload::Shader);
    r.core(ChunkKind::ShaderParams, &cores.shader_params, None, ChunkPayload::ShaderParams);
    r.core(ChunkKind::Style, &cores.style, None, ChunkPayload::Style);
    r.core(ChunkKind::DepthBuffer, &cores.depth_buffer, None, ChunkPayload::DepthBuffer);
    r.core(ChunkKind::ColorBuffer, &cores.color_buffer, None, ChunkPayload::ColorBuffer);
    r.core(ChunkKind::View, &cores.view, None, ChunkPayload::View);
    r.core(ChunkKind::Name, &cores.name, None, ChunkPayload::Name);
    r.core(ChunkKind::Lights, &cores.lights, None, ChunkPayload::Lights);
    r.core(ChunkKind::Material, &cores.material, None, ChunkPayload::Material);
    r.core(ChunkKind::Texture, &cores.texture, None, ChunkPayload::Texture);
    r.core(ChunkKind::Cubemap, &cores.cubemap, None, ChunkPayload::Cubemap);
    r.core(ChunkKind::Clips, &cores.clips, None, ChunkPayload::Clips);

    let morph = cores.morph_geometry.present().cloned();
    r.core(
        ChunkKind::Geometry,
        &cores.geometry,
        morph.as_ref().map(|m| m.id),
        |geometry| ChunkPayload::Geometry { geometry, morph },
    );
    r.core(ChunkKind::Draw, &cores.geometry, None, ChunkPayload::Draw);
}

/// Releases every chunk held by `object`, leaving all slots empty.
pub fn release_chunks(cache: &mut ChunkCache, object: &mut RenderObject) {
    for slot in &mut object.chunks {
        if let Some(held) = slot.take() {
            cache.release(held.handle);
        }
    }
}

//! Display Scheduler
//!
//! [`Display`] owns every piece of mutable scheduler state and exposes the
//! host-facing surface:
//!
//! | Call                  | Effect                                                 |
//! |-----------------------|--------------------------------------------------------|
//! | `compile_object`      | Create/update an object; `OBJECT_LIST` or `STATE_ORDER` |
//! | `remove_object`       | Release an object; `OBJECT_LIST`                       |
//! | `select_tags`         | Change the tag selector; `DRAW_LIST`                   |
//! | `render`              | Run dirty stages, execute the image list if due        |
//! | `pick`                | `render`, then colour (and optionally ray) pick        |
//! | `context_restored`    | Rebuild programs, drop pick buffers; `OBJECT_LIST`     |
//!
//! # Render Cascade
//!
//! ```text
//! OBJECT_LIST → rebuild object list from the registry
//! STATE_ORDER → recompute sort keys
//! STATE_SORT  → sort object list by key
//! DRAW_LIST   → rebuild image + pick lists (ray pick buffer goes stale)
//! IMAGE|force → execute image list        (colour pick buffer goes stale)
//! ```
//!
//! Each stage runs only when its flag is set and clears only its own flag.

use std::sync::Arc;

use glam::Vec3;

use crate::errors::Result;
use crate::renderer::chunk::{Chunk, ChunkCache, ChunkHandle};
use crate::renderer::compiler::{compile_chunks, release_chunks};
use crate::renderer::device::{GpuDevice, PickTargetKind, TargetHandle};
use crate::renderer::dirty::DirtyFlags;
use crate::renderer::draw_list::{DrawCommand, DrawLists, build_draw_lists};
use crate::renderer::executor::{PassOptions, execute};
use crate::renderer::frame::{FrameContext, PassMode};
use crate::renderer::object::{ObjectId, ObjectKey, ObjectRegistry, RenderObject};
use crate::renderer::picking::{
    PickRequest, PickResult, Picker, decode_pick_index, unpack_depth, unproject_canvas,
};
use crate::renderer::pipeline::{ProgramCache, ProgramKey};
use crate::renderer::settings::DisplaySettings;
use crate::renderer::sort_key::{SortKeyFields, StateSortKey, TextureSlots};
use crate::renderer::tags::TagSelector;
use crate::scene::{ActiveCores, derive_ambient};

/// Options of one [`Display::render`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Clear buffers before drawing; `None` uses [`DisplaySettings::clear_by_default`].
    pub clear: Option<bool>,
    /// Execute the image list even when the image is not dirty.
    pub force: bool,
}

/// Counters describing the scheduler's current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStats {
    pub objects: usize,
    pub programs: usize,
    pub chunks: usize,
    pub image_commands: usize,
    pub pick_commands: usize,
    /// Draw calls issued by the last image pass.
    pub draw_calls: u32,
}

pub struct Display {
    settings: DisplaySettings,

    // ─── Caches ───
    programs: ProgramCache,
    chunks: ChunkCache,
    objects: ObjectRegistry,
    texture_slots: TextureSlots,

    // ─── Derived Lists ───
    object_list: Vec<ObjectKey>,
    lists: DrawLists,
    dirty: DirtyFlags,
    tags: TagSelector,

    // ─── Frame ───
    frame: FrameContext,
    picker: Picker,
    ambient: Vec3,
    last_draw_calls: u32,
}

impl Display {
    #[must_use]
    pub fn new(settings: DisplaySettings) -> Self {
        Self {
            settings,
            programs: ProgramCache::new(),
            chunks: ChunkCache::new(),
            objects: ObjectRegistry::new(),
            texture_slots: TextureSlots::new(),
            object_list: Vec::new(),
            lists: DrawLists::default(),
            dirty: DirtyFlags::cascade(DirtyFlags::OBJECT_LIST),
            tags: TagSelector::new(),
            frame: FrameContext::new(),
            picker: Picker::new(),
            ambient: Vec3::ZERO,
            last_draw_calls: 0,
        }
    }

    // ========================================================================
    // Object Compilation
    // ========================================================================

    /// Creates or updates the render object for `id` from the active cores.
    ///
    /// A program is (re)acquired only when the shader-relevant cores hash
    /// differently from last time. If program creation fails, a new object is
    /// discarded and an existing one keeps its previous program.
    pub fn compile_object(
        &mut self,
        device: &mut dyn GpuDevice,
        id: ObjectId,
        cores: &ActiveCores,
    ) -> Result<()> {
        let (_, object, created) = self.objects.get_or_insert(id);

        let shader_cores = cores.shader_cores();
        let hash = ProgramKey::from_cores(&shader_cores);
        if object.program.is_none() || object.hash != Some(hash) {
            match self.programs.acquire(device, &shader_cores) {
                Ok(program) => {
                    if let Some(old) = object.program.replace(program) {
                        self.programs.release(device, old);
                    }
                    object.hash = Some(hash);
                }
                Err(err) => {
                    if created {
                        if let Some(object) = self.objects.remove(id) {
                            self.objects.recycle(object);
                        }
                    }
                    return Err(err);
                }
            }
        }

        if object.tag.state_id() != cores.tag.state_id() {
            object.tag_match = None;
        }
        object.stage = cores.stage.clone();
        object.layer = cores.layer.clone();
        object.render_target = cores.render_target.clone();
        let (old_texture, new_texture) = (object.texture.state_id(), cores.texture.state_id());
        if old_texture != new_texture {
            if let Some(texture) = new_texture {
                self.texture_slots.acquire(texture);
            }
            if let Some(texture) = old_texture {
                self.texture_slots.release(texture);
            }
        }
        object.texture = cores.texture.clone();
        object.enable = cores.enable.clone();
        object.flags = cores.flags.clone();
        object.tag = cores.tag.clone();

        compile_chunks(&mut self.chunks, object, cores);

        if let Some(ambient) = cores.lights.present().and_then(|lights| derive_ambient(lights)) {
            self.ambient = ambient;
        }

        self.dirty.escalate(if created {
            DirtyFlags::OBJECT_LIST
        } else {
            DirtyFlags::STATE_ORDER
        });
        self.picker.mark_ray_stale();
        Ok(())
    }

    /// Releases the object for `id`; returns `false` if it was unknown.
    pub fn remove_object(&mut self, device: &mut dyn GpuDevice, id: ObjectId) -> bool {
        let Some(mut object) = self.objects.remove(id) else {
            log::warn!("remove_object: unknown object {id}");
            return false;
        };
        release_chunks(&mut self.chunks, &mut object);
        if let Some(texture) = object.texture.state_id() {
            self.texture_slots.release(texture);
        }
        if let Some(program) = object.program.take() {
            self.programs.release(device, program);
        }
        self.objects.recycle(object);

        self.dirty.escalate(DirtyFlags::OBJECT_LIST);
        self.picker.mark_ray_stale();
        true
    }

    // ========================================================================
    // Tag Selection
    // ========================================================================

    /// Restricts drawing to tagged objects matching `selector` (a regular
    /// expression). Untagged objects always draw. An empty selector clears.
    pub fn select_tags(&mut self, selector: &str) -> Result<()> {
        self.tags.select(selector)?;
        self.dirty.escalate(DirtyFlags::DRAW_LIST);
        Ok(())
    }

    pub fn clear_tag_selector(&mut self) {
        self.tags.clear();
        self.dirty.escalate(DirtyFlags::DRAW_LIST);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Runs every dirty stage and executes the image list when due.
    ///
    /// Returns whether the image list was executed.
    pub fn render(&mut self, device: &mut dyn GpuDevice, options: RenderOptions) -> Result<bool> {
        self.update_lists();

        let due = self.dirty.contains(DirtyFlags::IMAGE) || options.force;
        if !due {
            return Ok(false);
        }

        let pass = PassOptions {
            mode: PassMode::Draw,
            target: None,
            clear: options.clear.unwrap_or(self.settings.clear_by_default),
            transparent: self.settings.transparent,
            ambient: self.ambient,
            vertex_attrib_reset_slots: self.settings.vertex_attrib_reset_slots,
        };
        execute(
            device,
            &mut self.frame,
            &self.lists.image,
            &self.chunks,
            &self.programs,
            &pass,
        );
        self.last_draw_calls = self.frame.draw_calls;
        self.dirty.consume(DirtyFlags::IMAGE);
        self.picker.mark_color_stale();
        Ok(true)
    }

    fn update_lists(&mut self) {
        if self.dirty.consume(DirtyFlags::OBJECT_LIST) {
            self.object_list.clear();
            self.object_list.extend(self.objects.keys());
        }

        if self.dirty.consume(DirtyFlags::STATE_ORDER) {
            let overflow = self.settings.sort_key_overflow;
            let slots = &self.texture_slots;
            for (_, object) in self.objects.iter_mut() {
                object.sort_key = StateSortKey::compute(&sort_fields(object, slots), overflow);
            }
        }

        if self.dirty.consume(DirtyFlags::STATE_SORT) {
            let objects = &self.objects;
            self.object_list.sort_by_key(|&key| {
                objects
                    .get(key)
                    .map_or(StateSortKey::UNBOUND, |object| object.sort_key)
            });
        }

        if self.dirty.consume(DirtyFlags::DRAW_LIST) {
            build_draw_lists(
                &self.object_list,
                &mut self.objects,
                &self.tags,
                &mut self.lists,
            );
            self.picker.mark_ray_stale();
        }
    }

    // ========================================================================
    // Picking
    // ========================================================================

    /// Renders if needed, then resolves the object under the canvas pixel.
    ///
    /// Returns `Ok(None)` when nothing pickable is hit.
    pub fn pick(
        &mut self,
        device: &mut dyn GpuDevice,
        request: PickRequest,
    ) -> Result<Option<PickResult>> {
        self.render(device, RenderOptions::default())?;
        let result = self.resolve_pick(device, request);
        device.bind_target(None);
        result
    }

    fn resolve_pick(
        &mut self,
        device: &mut dyn GpuDevice,
        request: PickRequest,
    ) -> Result<Option<PickResult>> {
        let x = request.canvas_x.max(0.0) as u32;
        let y = request.canvas_y.max(0.0) as u32;

        let color = self.picker.ensure_buffer(
            device,
            PickTargetKind::Color,
            self.settings.pick_color_format,
        )?;
        if self.picker.is_color_stale() {
            self.run_pick_pass(device, color.target, false);
            self.picker.pick_names = self.frame.pick_names.clone();
            self.picker.mark_fresh(PickTargetKind::Color);
        }

        device.bind_target(Some(color.target));
        let index = decode_pick_index(device.read_pixel(x, y));
        let Some(name) = self.picker.name_for(index).map(Arc::clone) else {
            return Ok(None);
        };
        let canvas_pos = [request.canvas_x, request.canvas_y];
        let mut result = PickResult::new(&name, canvas_pos);

        if request.ray_pick {
            let ray = self.picker.ensure_buffer(
                device,
                PickTargetKind::RayDepth,
                self.settings.ray_pick_format,
            )?;
            if self.picker.is_ray_stale() {
                self.run_pick_pass(device, ray.target, true);
                self.picker.view = self.frame.view_matrix;
                self.picker.projection = self.frame.projection_matrix;
                self.picker.mark_fresh(PickTargetKind::RayDepth);
            }

            device.bind_target(Some(ray.target));
            let depth = unpack_depth(device.read_pixel(x, y));
            result.world_pos = Some(unproject_canvas(
                (request.canvas_x, request.canvas_y),
                (ray.width, ray.height),
                depth,
                self.picker.view,
                self.picker.projection,
            ));
        }

        Ok(Some(result))
    }

    fn run_pick_pass(
        &mut self,
        device: &mut dyn GpuDevice,
        target: TargetHandle,
        ray: bool,
    ) {
        let pass = PassOptions {
            mode: PassMode::Pick { ray },
            target: Some(target),
            clear: true,
            transparent: self.settings.transparent,
            ambient: self.ambient,
            vertex_attrib_reset_slots: self.settings.vertex_attrib_reset_slots,
        };
        execute(
            device,
            &mut self.frame,
            &self.lists.pick,
            &self.chunks,
            &self.programs,
            &pass,
        );
    }

    // ========================================================================
    // Host Conveniences
    // ========================================================================

    /// Re-acquires GPU-side caches after the context was lost and restored.
    pub fn context_restored(&mut self, device: &mut dyn GpuDevice) -> Result<()> {
        self.programs.restore(device)?;
        self.picker.forget_buffers();
        self.dirty.escalate(DirtyFlags::OBJECT_LIST);
        log::info!(
            "Context restored: {} programs, {} objects",
            self.programs.len(),
            self.objects.len()
        );
        Ok(())
    }

    /// Drops both pick buffers after the drawing buffer changed size.
    pub fn resize(&mut self, device: &mut dyn GpuDevice) {
        self.picker.destroy_buffers(device);
        self.dirty.escalate(DirtyFlags::IMAGE);
    }

    /// Forces the next `render` to execute the image list.
    pub fn request_redraw(&mut self) {
        self.dirty.escalate(DirtyFlags::IMAGE);
    }

    /// Marks the ray pick buffer stale without touching the image.
    pub fn invalidate_ray_pick(&mut self) {
        self.picker.mark_ray_stale();
    }

    #[must_use]
    pub fn stats(&self) -> DisplayStats {
        DisplayStats {
            objects: self.objects.len(),
            programs: self.programs.len(),
            chunks: self.chunks.len(),
            image_commands: self.lists.image.len(),
            pick_commands: self.lists.pick.len(),
            draw_calls: self.last_draw_calls,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    #[must_use]
    pub fn image_commands(&self) -> &[DrawCommand] {
        &self.lists.image
    }

    #[must_use]
    pub fn pick_commands(&self) -> &[DrawCommand] {
        &self.lists.pick
    }

    #[inline]
    #[must_use]
    pub fn ambient_color(&self) -> Vec3 {
        self.ambient
    }

    #[must_use]
    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&RenderObject> {
        self.objects.find(id)
    }

    #[must_use]
    pub fn chunk(&self, handle: ChunkHandle) -> Option<&Chunk> {
        self.chunks.get(handle)
    }

    #[must_use]
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    #[must_use]
    pub fn chunks(&self) -> &ChunkCache {
        &self.chunks
    }

    #[must_use]
    pub fn texture_slots(&self) -> &TextureSlots {
        &self.texture_slots
    }

    #[must_use]
    pub fn picker(&self) -> &Picker {
        &self.picker
    }
}

fn sort_fields(object: &RenderObject, slots: &TextureSlots) -> SortKeyFields {
    SortKeyFields {
        stage_priority: object.stage.present().map_or(0, |stage| stage.priority),
        transparent: object.flags.present().is_some_and(|flags| flags.transparent),
        layer_priority: object.layer.present().map_or(0, |layer| layer.priority),
        program: object.program,
        texture_slot: object
            .texture
            .state_id()
            .and_then(|texture| slots.get(texture)),
    }
}

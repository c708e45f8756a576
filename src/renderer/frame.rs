//! Frame Context
//!
//! Mutable scratch state shared by every chunk during one execution pass.
//! The executor resets it at the start of each pass.
//!
//! Besides transient per-pass data (current program, pick counter, matrices
//! in effect) it carries a shadow copy of the fixed-function state last sent
//! to the device. The `set_*` helpers compare against that copy and skip
//! redundant device calls. The shadow copy starts unknown after a reset, so
//! the first write of every pass always reaches the device.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::renderer::device::{DepthState, GpuDevice, TargetHandle};
use crate::renderer::pipeline::{ProgramId, ProgramMode};
use crate::scene::{NameCore, StateId};

/// What a pass renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassMode {
    /// Shaded image.
    #[default]
    Draw,
    /// Flat pick colours, or packed depth when `ray` is set.
    Pick { ray: bool },
}

impl PassMode {
    #[inline]
    #[must_use]
    pub fn is_pick(self) -> bool {
        matches!(self, Self::Pick { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_ray_pick(self) -> bool {
        matches!(self, Self::Pick { ray: true })
    }

    /// Program variant used by this pass.
    #[inline]
    #[must_use]
    pub fn program_mode(self) -> ProgramMode {
        match self {
            Self::Draw => ProgramMode::Draw,
            Self::Pick { .. } => ProgramMode::Pick,
        }
    }
}

/// Fixed-function state last sent to the device. `None` means unknown.
#[derive(Debug, Clone, Default)]
struct ShadowState {
    line_width: Option<f32>,
    cull_mode: Option<Option<wgpu::Face>>,
    front_face: Option<wgpu::FrontFace>,
    blend: Option<Option<wgpu::BlendState>>,
    color_mask: Option<wgpu::ColorWrites>,
    depth: Option<DepthState>,
    scissor_test: Option<bool>,
}

/// Per-pass mutable state.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub mode: PassMode,
    /// Program bound by the last program chunk.
    pub program: Option<ProgramId>,
    /// Target the pass renders into; `None` is the default framebuffer.
    pub pass_target: Option<TargetHandle>,
    /// Render-target core currently bound, if any.
    pub render_target: Option<StateId>,
    pub ambient: Vec3,
    /// Index of the last pick name assigned, 1-based.
    pub pick_index: u32,
    /// Names in pick-index order; entry `i` has index `i + 1`.
    pub pick_names: Vec<Arc<NameCore>>,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub eye: Vec3,
    pub draw_calls: u32,
    shadow: ShadowState,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            mode: PassMode::Draw,
            program: None,
            pass_target: None,
            render_target: None,
            ambient: Vec3::ZERO,
            pick_index: 0,
            pick_names: Vec::new(),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            draw_calls: 0,
            shadow: ShadowState::default(),
        }
    }
}

impl FrameContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every field for a new pass.
    pub fn reset(&mut self, mode: PassMode, pass_target: Option<TargetHandle>, ambient: Vec3) {
        self.mode = mode;
        self.program = None;
        self.pass_target = pass_target;
        self.render_target = None;
        self.ambient = ambient;
        self.pick_index = 0;
        self.pick_names.clear();
        self.view_matrix = Mat4::IDENTITY;
        self.projection_matrix = Mat4::IDENTITY;
        self.eye = Vec3::ZERO;
        self.draw_calls = 0;
        self.shadow = ShadowState::default();
    }

    /// Records a pick name and returns its 1-based index.
    pub fn push_pick_name(&mut self, name: &Arc<NameCore>) -> u32 {
        self.pick_names.push(Arc::clone(name));
        self.pick_index += 1;
        self.pick_index
    }

    // ─── Elided Fixed-Function State ─────────────────────────────────────────

    pub fn set_line_width(&mut self, device: &mut dyn GpuDevice, width: f32) {
        if self.shadow.line_width != Some(width) {
            device.set_line_width(width);
            self.shadow.line_width = Some(width);
        }
    }

    pub fn set_cull_mode(&mut self, device: &mut dyn GpuDevice, face: Option<wgpu::Face>) {
        if self.shadow.cull_mode != Some(face) {
            device.set_cull_mode(face);
            self.shadow.cull_mode = Some(face);
        }
    }

    pub fn set_front_face(&mut self, device: &mut dyn GpuDevice, front_face: wgpu::FrontFace) {
        if self.shadow.front_face != Some(front_face) {
            device.set_front_face(front_face);
            self.shadow.front_face = Some(front_face);
        }
    }

    pub fn set_blend(&mut self, device: &mut dyn GpuDevice, blend: Option<wgpu::BlendState>) {
        if self.shadow.blend != Some(blend) {
            device.set_blend(blend);
            self.shadow.blend = Some(blend);
        }
    }

    pub fn set_color_mask(&mut self, device: &mut dyn GpuDevice, mask: wgpu::ColorWrites) {
        if self.shadow.color_mask != Some(mask) {
            device.set_color_mask(mask);
            self.shadow.color_mask = Some(mask);
        }
    }

    pub fn set_depth_state(&mut self, device: &mut dyn GpuDevice, state: DepthState) {
        if self.shadow.depth != Some(state) {
            device.set_depth_state(state);
            self.shadow.depth = Some(state);
        }
    }

    pub fn set_scissor_test(&mut self, device: &mut dyn GpuDevice, enabled: bool) {
        if self.shadow.scissor_test != Some(enabled) {
            device.set_scissor_test(enabled);
            self.shadow.scissor_test = Some(enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::{GpuCommand, RecordingDevice};

    #[test]
    fn test_redundant_state_is_elided() {
        let mut device = RecordingDevice::new(4, 4);
        let mut frame = FrameContext::new();
        frame.set_line_width(&mut device, 2.0);
        frame.set_line_width(&mut device, 2.0);
        frame.set_cull_mode(&mut device, None);
        frame.set_cull_mode(&mut device, None);
        assert_eq!(
            device.commands(),
            &[GpuCommand::LineWidth(2.0), GpuCommand::CullMode(None)]
        );
    }

    #[test]
    fn test_reset_forgets_shadow_state() {
        let mut device = RecordingDevice::new(4, 4);
        let mut frame = FrameContext::new();
        frame.set_scissor_test(&mut device, true);
        frame.reset(PassMode::Draw, None, Vec3::ZERO);
        frame.set_scissor_test(&mut device, true);
        assert_eq!(device.commands().len(), 2);
    }

    #[test]
    fn test_pick_names_are_one_based() {
        let mut frame = FrameContext::new();
        let name = Arc::new(NameCore::new("a", "root/a", 1));
        assert_eq!(frame.push_pick_name(&name), 1);
        assert_eq!(frame.push_pick_name(&name), 2);
        assert_eq!(frame.pick_names.len(), 2);
    }
}

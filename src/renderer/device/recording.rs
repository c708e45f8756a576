//! Headless recording device.
//!
//! Records every [`GpuDevice`] call as a [`GpuCommand`]. Pixel read-backs are
//! served from per-target-kind values configured with
//! [`RecordingDevice::set_readback`], so picking can be exercised without a GPU.

use rustc_hash::FxHashMap;

use super::{
    ClearFlags, DepthState, GeometryHandle, GpuDevice, GpuProgram, PickTargetKind, TargetHandle,
    TextureHandle, UniformName, UniformValue,
};
use crate::renderer::pipeline::{ProgramDescriptor, ProgramMode};
use crate::scene::RenderTargetBinding;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateProgram { program: GpuProgram, mode: ProgramMode },
    DestroyProgram(GpuProgram),
    CreatePickTarget { target: TargetHandle, kind: PickTargetKind, width: u32, height: u32 },
    DestroyTarget(TargetHandle),
    BindTarget(Option<TargetHandle>),
    BindRenderTarget(Vec<RenderTargetBinding>),
    Viewport { x: u32, y: u32, width: u32, height: u32 },
    ClearColor(wgpu::Color),
    Clear(ClearFlags),
    CullMode(Option<wgpu::Face>),
    FrontFace(wgpu::FrontFace),
    Blend(Option<wgpu::BlendState>),
    ColorMask(wgpu::ColorWrites),
    DepthState(DepthState),
    ScissorTest(bool),
    LineWidth(f32),
    UseProgram(GpuProgram),
    Uniform(UniformName, UniformValue),
    BindTexture { unit: u32, texture: TextureHandle },
    BindGeometry { geometry: GeometryHandle, morph_targets: Vec<GeometryHandle> },
    Draw { topology: wgpu::PrimitiveTopology, count: u32, indexed: bool },
    ReadPixel { x: u32, y: u32 },
    Flush,
    UnbindVertexArray,
    DisableVertexAttrib(u32),
}

/// [`GpuDevice`] that records calls instead of issuing them.
#[derive(Debug)]
pub struct RecordingDevice {
    width: u32,
    height: u32,
    next_handle: u64,
    commands: Vec<GpuCommand>,
    live_programs: usize,
    targets: FxHashMap<TargetHandle, PickTargetKind>,
    bound_target: Option<TargetHandle>,
    readback: FxHashMap<PickTargetKind, [u8; 4]>,
    fail_programs: bool,
    fail_pick_targets: bool,
    vertex_arrays: bool,
}

impl RecordingDevice {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_handle: 1,
            commands: Vec::new(),
            live_programs: 0,
            targets: FxHashMap::default(),
            bound_target: None,
            readback: FxHashMap::default(),
            fail_programs: false,
            fail_pick_targets: false,
            vertex_arrays: false,
        }
    }

    /// Changes the reported drawing-buffer size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Pixel returned by `read_pixel` while a target of `kind` is bound.
    pub fn set_readback(&mut self, kind: PickTargetKind, pixel: [u8; 4]) {
        self.readback.insert(kind, pixel);
    }

    /// Makes subsequent `create_program` calls fail.
    pub fn fail_program_creation(&mut self, fail: bool) {
        self.fail_programs = fail;
    }

    /// Makes subsequent `create_pick_target` calls fail.
    pub fn fail_pick_targets(&mut self, fail: bool) {
        self.fail_pick_targets = fail;
    }

    /// Reports a captured vertex-array-object extension.
    pub fn enable_vertex_arrays(&mut self, enabled: bool) {
        self.vertex_arrays = enabled;
    }

    #[must_use]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Drains the recorded commands.
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of programs created and not yet destroyed.
    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.live_programs
    }

    /// Number of recorded draw calls.
    #[must_use]
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GpuCommand::Draw { .. }))
            .count()
    }

    fn allocate(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl GpuDevice for RecordingDevice {
    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<GpuProgram, String> {
        if self.fail_programs {
            return Err(format!("program link failed for {:?}", desc.mode));
        }
        let program = GpuProgram(self.allocate());
        self.live_programs += 1;
        self.commands.push(GpuCommand::CreateProgram {
            program,
            mode: desc.mode,
        });
        Ok(program)
    }

    fn destroy_program(&mut self, program: GpuProgram) {
        self.live_programs = self.live_programs.saturating_sub(1);
        self.commands.push(GpuCommand::DestroyProgram(program));
    }

    fn create_pick_target(
        &mut self,
        kind: PickTargetKind,
        width: u32,
        height: u32,
        _format: wgpu::TextureFormat,
    ) -> Result<TargetHandle, String> {
        if self.fail_pick_targets {
            return Err("FRAMEBUFFER_INCOMPLETE_ATTACHMENT".to_string());
        }
        let target = TargetHandle(self.allocate());
        self.targets.insert(target, kind);
        self.commands.push(GpuCommand::CreatePickTarget {
            target,
            kind,
            width,
            height,
        });
        Ok(target)
    }

    fn destroy_target(&mut self, target: TargetHandle) {
        self.targets.remove(&target);
        self.commands.push(GpuCommand::DestroyTarget(target));
    }

    fn bind_target(&mut self, target: Option<TargetHandle>) {
        self.bound_target = target;
        self.commands.push(GpuCommand::BindTarget(target));
    }

    fn bind_render_target(&mut self, bindings: &[RenderTargetBinding]) {
        self.bound_target = None;
        self.commands
            .push(GpuCommand::BindRenderTarget(bindings.to_vec()));
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.commands.push(GpuCommand::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_clear_color(&mut self, color: wgpu::Color) {
        self.commands.push(GpuCommand::ClearColor(color));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(GpuCommand::Clear(flags));
    }

    fn set_cull_mode(&mut self, face: Option<wgpu::Face>) {
        self.commands.push(GpuCommand::CullMode(face));
    }

    fn set_front_face(&mut self, front_face: wgpu::FrontFace) {
        self.commands.push(GpuCommand::FrontFace(front_face));
    }

    fn set_blend(&mut self, blend: Option<wgpu::BlendState>) {
        self.commands.push(GpuCommand::Blend(blend));
    }

    fn set_color_mask(&mut self, mask: wgpu::ColorWrites) {
        self.commands.push(GpuCommand::ColorMask(mask));
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.commands.push(GpuCommand::DepthState(state));
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.commands.push(GpuCommand::ScissorTest(enabled));
    }

    fn set_line_width(&mut self, width: f32) {
        self.commands.push(GpuCommand::LineWidth(width));
    }

    fn use_program(&mut self, program: GpuProgram) {
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn set_uniform(&mut self, name: UniformName, value: UniformValue) {
        self.commands.push(GpuCommand::Uniform(name, value));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn bind_geometry(&mut self, geometry: GeometryHandle, morph_targets: &[GeometryHandle]) {
        self.commands.push(GpuCommand::BindGeometry {
            geometry,
            morph_targets: morph_targets.to_vec(),
        });
    }

    fn draw(&mut self, topology: wgpu::PrimitiveTopology, count: u32, indexed: bool) {
        self.commands.push(GpuCommand::Draw {
            topology,
            count,
            indexed,
        });
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4] {
        self.commands.push(GpuCommand::ReadPixel { x, y });
        self.bound_target
            .and_then(|target| self.targets.get(&target))
            .and_then(|kind| self.readback.get(kind))
            .copied()
            .unwrap_or([0; 4])
    }

    fn flush(&mut self) {
        self.commands.push(GpuCommand::Flush);
    }

    fn has_vertex_array_objects(&self) -> bool {
        self.vertex_arrays
    }

    fn unbind_vertex_array(&mut self) {
        self.commands.push(GpuCommand::UnbindVertexArray);
    }

    fn disable_vertex_attrib(&mut self, slot: u32) {
        self.commands.push(GpuCommand::DisableVertexAttrib(slot));
    }
}

//! GPU Device Seam
//!
//! The scheduler never talks to a graphics API directly. Every GPU call made
//! while executing a draw or pick list goes through [`GpuDevice`], which the
//! host implements on top of its buffer / texture / shader wrapper objects.
//!
//! State vocabulary is expressed in `wgpu` types (`Color`, `Face`,
//! `FrontFace`, `BlendState`, `CompareFunction`, `PrimitiveTopology`,
//! `TextureFormat`); a `wgpu`-backed host forwards them unchanged.
//!
//! [`RecordingDevice`] is a headless implementation that records each call;
//! it backs the test-suite and is useful for diffing command streams.

mod recording;

pub use recording::{GpuCommand, RecordingDevice};

use std::sync::Arc;

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

use crate::renderer::pipeline::ProgramDescriptor;
use crate::scene::RenderTargetBinding;

// ─── Opaque Handles ──────────────────────────────────────────────────────────

/// Handle to a GPU program owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuProgram(pub u64);

/// Handle to a texture owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a vertex/index buffer set owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// Handle to an off-screen render target (framebuffer) owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u64);

// ─── Pass State Types ────────────────────────────────────────────────────────

/// Off-screen buffers allocated by the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickTargetKind {
    /// Color + depth target receiving flat pick-index colors.
    Color,
    /// Target receiving packed normalized depth for ray picking.
    RayDepth,
}

bitflags! {
    /// Buffers cleared by [`GpuDevice::clear`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Fixed-function depth configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub enabled: bool,
    pub compare: wgpu::CompareFunction,
    pub clear_depth: f32,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            enabled: true,
            compare: wgpu::CompareFunction::Less,
            clear_depth: 1.0,
        }
    }
}

/// Uniform slots understood by generated programs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniformName {
    ModelMatrix,
    NormalMatrix,
    ViewMatrix,
    ProjectionMatrix,
    EyePosition,
    AmbientColor,
    BaseColor,
    SpecularColor,
    Specular,
    Shine,
    Alpha,
    Emit,
    LightColor(u8),
    LightDirection(u8),
    LightPosition(u8),
    LightAttenuation(u8),
    ClipNormal(u8),
    ClipDistance(u8),
    ClipMode(u8),
    Sampler(u8),
    TextureBlendFactor(u8),
    CubemapSampler,
    CubemapIntensity,
    MorphFactor,
    PickColor,
    RayPick,
    /// Parameter declared by a custom shader core.
    Custom(Arc<str>),
}

/// Value assigned to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

// ─── Device Trait ────────────────────────────────────────────────────────────

/// Immediate-mode GPU interface driven by the frame executor.
///
/// Calls are issued inline and synchronously from the thread driving the
/// render loop. `read_pixel` is a blocking round-trip to the driver.
pub trait GpuDevice {
    /// Size of the default drawing buffer in pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Compiles a program; `Err` carries a device-specific reason.
    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<GpuProgram, String>;

    fn destroy_program(&mut self, program: GpuProgram);

    /// Allocates an off-screen pick target; `Err` means the framebuffer is incomplete.
    fn create_pick_target(
        &mut self,
        kind: PickTargetKind,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<TargetHandle, String>;

    fn destroy_target(&mut self, target: TargetHandle);

    /// Binds an off-screen target, or the default framebuffer for `None`.
    fn bind_target(&mut self, target: Option<TargetHandle>);

    /// Binds the attachments declared by a render-target core.
    fn bind_render_target(&mut self, bindings: &[RenderTargetBinding]);

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    fn set_clear_color(&mut self, color: wgpu::Color);

    fn clear(&mut self, flags: ClearFlags);

    fn set_cull_mode(&mut self, face: Option<wgpu::Face>);

    fn set_front_face(&mut self, front_face: wgpu::FrontFace);

    fn set_blend(&mut self, blend: Option<wgpu::BlendState>);

    fn set_color_mask(&mut self, mask: wgpu::ColorWrites);

    fn set_depth_state(&mut self, state: DepthState);

    fn set_scissor_test(&mut self, enabled: bool);

    fn set_line_width(&mut self, width: f32);

    fn use_program(&mut self, program: GpuProgram);

    /// Sets a uniform on the program last passed to `use_program`.
    fn set_uniform(&mut self, name: UniformName, value: UniformValue);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Binds vertex/index buffers plus optional morph-target buffers.
    fn bind_geometry(&mut self, geometry: GeometryHandle, morph_targets: &[GeometryHandle]);

    fn draw(&mut self, topology: wgpu::PrimitiveTopology, count: u32, indexed: bool);

    /// Reads back one RGBA8 pixel of the bound target at canvas coordinates
    /// (top-left origin).
    fn read_pixel(&mut self, x: u32, y: u32) -> [u8; 4];

    fn flush(&mut self);

    /// Whether a vertex-array-object extension handle was captured.
    fn has_vertex_array_objects(&self) -> bool {
        false
    }

    fn unbind_vertex_array(&mut self) {}

    fn disable_vertex_attrib(&mut self, _slot: u32) {}
}

//! Concrete state cores.
//!
//! Each struct is an immutable snapshot of one kind of scene state. The
//! component layer builds a new core (with a fresh [`StateId`]) whenever the
//! state changes; the scheduler only references whichever core is active when
//! an object is compiled.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use super::state::{ShaderHash, StateCore, StateId};
use crate::renderer::device::{TargetHandle, TextureHandle, UniformValue};

/// Implements [`StateCore`] for cores whose configuration never reaches shader text.
macro_rules! impl_plain_core {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl StateCore for $ty {
                #[inline]
                fn state_id(&self) -> StateId {
                    self.id
                }
            }
        )+
    };
}

/// Implements [`StateCore`] for cores carrying a precomputed shader hash.
macro_rules! impl_hashed_core {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl StateCore for $ty {
                #[inline]
                fn state_id(&self) -> StateId {
                    self.id
                }

                #[inline]
                fn shader_hash(&self) -> Option<ShaderHash> {
                    Some(self.hash)
                }
            }
        )+
    };
}

// ============================================================================
// Ordering & Visibility
// ============================================================================

/// Render stage; higher priority draws later. Priorities may be negative.
#[derive(Debug, Clone)]
pub struct StageCore {
    pub id: StateId,
    pub priority: i32,
    pub pickable: bool,
}

impl StageCore {
    #[must_use]
    pub fn new(priority: i32, pickable: bool) -> Self {
        Self {
            id: StateId::next(),
            priority,
            pickable,
        }
    }
}

/// Layer within a stage.
#[derive(Debug, Clone)]
pub struct LayerCore {
    pub id: StateId,
    pub priority: i32,
    pub enabled: bool,
}

impl LayerCore {
    #[must_use]
    pub fn new(priority: i32, enabled: bool) -> Self {
        Self {
            id: StateId::next(),
            priority,
            enabled,
        }
    }
}

/// Hard visibility switch.
#[derive(Debug, Clone)]
pub struct EnableCore {
    pub id: StateId,
    pub enabled: bool,
}

impl EnableCore {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            id: StateId::next(),
            enabled,
        }
    }
}

/// Per-object render flags.
#[derive(Debug, Clone)]
pub struct FlagsCore {
    pub id: StateId,
    pub enabled: bool,
    pub picking: bool,
    pub transparent: bool,
    /// Draw back faces (disables culling).
    pub backfaces: bool,
    pub front_face: wgpu::FrontFace,
}

impl Default for FlagsCore {
    fn default() -> Self {
        Self {
            id: StateId::next(),
            enabled: true,
            picking: true,
            transparent: false,
            backfaces: true,
            front_face: wgpu::FrontFace::Ccw,
        }
    }
}

impl FlagsCore {
    #[must_use]
    pub fn transparent() -> Self {
        Self {
            transparent: true,
            ..Self::default()
        }
    }
}

/// Free-form tag matched against the active tag selector.
#[derive(Debug, Clone)]
pub struct TagCore {
    pub id: StateId,
    pub tag: String,
}

impl TagCore {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: StateId::next(),
            tag: tag.into(),
        }
    }
}

/// Pick identity reported back by the picker.
#[derive(Debug, Clone)]
pub struct NameCore {
    pub id: StateId,
    pub name: String,
    pub path: String,
    pub node_id: u64,
}

impl NameCore {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>, node_id: u64) -> Self {
        Self {
            id: StateId::next(),
            name: name.into(),
            path: path.into(),
            node_id,
        }
    }
}

// ============================================================================
// Render Targets
// ============================================================================

/// Attachment role of a render-target binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetKind {
    Color,
    Depth,
}

/// One named off-screen target an object renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBinding {
    pub target: TargetHandle,
    pub kind: RenderTargetKind,
}

/// Set of off-screen targets; an empty set means the default framebuffer.
#[derive(Debug, Clone)]
pub struct RenderTargetCore {
    pub id: StateId,
    pub targets: SmallVec<[RenderTargetBinding; 2]>,
}

impl RenderTargetCore {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = RenderTargetBinding>) -> Self {
        Self {
            id: StateId::next(),
            targets: targets.into_iter().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Object-to-world transform.
#[derive(Debug, Clone)]
pub struct ModelTransformCore {
    pub id: StateId,
    pub matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl ModelTransformCore {
    #[must_use]
    pub fn new(matrix: Mat4) -> Self {
        Self {
            id: StateId::next(),
            matrix,
            normal_matrix: matrix.inverse().transpose(),
        }
    }
}

/// World-to-view transform built from a look-at triple.
#[derive(Debug, Clone)]
pub struct ViewTransformCore {
    pub id: StateId,
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,
    pub matrix: Mat4,
}

impl ViewTransformCore {
    #[must_use]
    pub fn look_at(eye: Vec3, look: Vec3, up: Vec3) -> Self {
        Self {
            id: StateId::next(),
            eye,
            look,
            up,
            matrix: Mat4::look_at_rh(eye, look, up),
        }
    }
}

/// View-to-clip transform (OpenGL clip-space conventions, z in [-1, 1]).
#[derive(Debug, Clone)]
pub struct ProjectionCore {
    pub id: StateId,
    pub matrix: Mat4,
}

impl ProjectionCore {
    #[must_use]
    pub fn new(matrix: Mat4) -> Self {
        Self {
            id: StateId::next(),
            matrix,
        }
    }

    #[must_use]
    pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(Mat4::perspective_rh_gl(fov_y_radians, aspect, near, far))
    }
}

// ============================================================================
// Surface Appearance
// ============================================================================

/// Phong-style material parameters.
#[derive(Debug, Clone)]
pub struct MaterialCore {
    pub id: StateId,
    pub base_color: Vec3,
    pub specular_color: Vec3,
    pub specular: f32,
    pub shine: f32,
    pub alpha: f32,
    pub emit: f32,
}

impl Default for MaterialCore {
    fn default() -> Self {
        Self {
            id: StateId::next(),
            base_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            specular: 1.0,
            shine: 70.0,
            alpha: 1.0,
            emit: 0.0,
        }
    }
}

impl MaterialCore {
    #[must_use]
    pub fn with_color(base_color: Vec3) -> Self {
        Self {
            base_color,
            ..Self::default()
        }
    }
}

/// Material channel a texture layer modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureApplyTo {
    BaseColor,
    Specular,
    Emit,
    Alpha,
    Normals,
}

impl TextureApplyTo {
    fn tag(self) -> &'static str {
        match self {
            Self::BaseColor => "base",
            Self::Specular => "spec",
            Self::Emit => "emit",
            Self::Alpha => "alpha",
            Self::Normals => "normals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureLayer {
    pub texture: TextureHandle,
    pub apply_to: TextureApplyTo,
    pub blend_factor: f32,
}

/// Stack of texture layers.
#[derive(Debug, Clone)]
pub struct TextureCore {
    pub id: StateId,
    pub layers: SmallVec<[TextureLayer; 4]>,
    pub hash: ShaderHash,
}

impl TextureCore {
    #[must_use]
    pub fn new(layers: impl IntoIterator<Item = TextureLayer>) -> Self {
        let layers: SmallVec<[TextureLayer; 4]> = layers.into_iter().collect();
        let descriptor = layers
            .iter()
            .map(|layer| layer.apply_to.tag())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            id: StateId::next(),
            hash: ShaderHash::of_descriptor(&format!("tex:{}:{descriptor}", layers.len())),
            layers,
        }
    }
}

/// Environment cube map for reflections.
#[derive(Debug, Clone)]
pub struct CubemapCore {
    pub id: StateId,
    pub texture: TextureHandle,
    pub intensity: f32,
    pub hash: ShaderHash,
}

impl CubemapCore {
    #[must_use]
    pub fn new(texture: TextureHandle, intensity: f32) -> Self {
        Self {
            id: StateId::next(),
            texture,
            intensity,
            hash: ShaderHash::of_descriptor("cubemap:1"),
        }
    }
}

// ============================================================================
// Clipping
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipMode {
    Inside,
    Outside,
    Disabled,
}

impl ClipMode {
    fn tag(self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::Outside => "outside",
            Self::Disabled => "disabled",
        }
    }

    #[must_use]
    pub fn as_uniform(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Inside => 1,
            Self::Outside => 2,
        }
    }
}

/// Clip plane in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub normal: Vec3,
    pub distance: f32,
    pub mode: ClipMode,
}

/// Active clip planes; the hash covers plane count and modes only.
#[derive(Debug, Clone)]
pub struct ClipsCore {
    pub id: StateId,
    pub clips: SmallVec<[Clip; 4]>,
    pub hash: ShaderHash,
}

impl ClipsCore {
    #[must_use]
    pub fn new(clips: impl IntoIterator<Item = Clip>) -> Self {
        let clips: SmallVec<[Clip; 4]> = clips.into_iter().collect();
        let modes = clips
            .iter()
            .map(|clip| clip.mode.tag())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            id: StateId::next(),
            hash: ShaderHash::of_descriptor(&format!("clips:{}:{modes}", clips.len())),
            clips,
        }
    }
}

// ============================================================================
// Custom Shaders
// ============================================================================

/// Named uniform parameter list.
pub type ShaderParamList = Vec<(Arc<str>, UniformValue)>;

/// User-supplied shader source with default parameter values.
#[derive(Debug, Clone)]
pub struct ShaderCore {
    pub id: StateId,
    pub name: String,
    pub source: Arc<str>,
    pub defaults: ShaderParamList,
    pub hash: ShaderHash,
}

impl ShaderCore {
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<Arc<str>>, defaults: ShaderParamList) -> Self {
        let source: Arc<str> = source.into();
        Self {
            id: StateId::next(),
            name: name.into(),
            hash: ShaderHash(xxhash_rust::xxh3::xxh3_64(source.as_bytes())),
            source,
            defaults,
        }
    }
}

/// Overrides for custom shader parameters.
#[derive(Debug, Clone)]
pub struct ShaderParamsCore {
    pub id: StateId,
    pub params: ShaderParamList,
}

impl ShaderParamsCore {
    #[must_use]
    pub fn new(params: ShaderParamList) -> Self {
        Self {
            id: StateId::next(),
            params,
        }
    }
}

// ============================================================================
// Fixed-Function State
// ============================================================================

#[derive(Debug, Clone)]
pub struct StyleCore {
    pub id: StateId,
    pub line_width: f32,
}

impl StyleCore {
    #[must_use]
    pub fn new(line_width: f32) -> Self {
        Self {
            id: StateId::next(),
            line_width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DepthBufferCore {
    pub id: StateId,
    pub enabled: bool,
    pub clear_depth: f32,
    pub compare: wgpu::CompareFunction,
}

impl DepthBufferCore {
    #[must_use]
    pub fn new(enabled: bool, compare: wgpu::CompareFunction) -> Self {
        Self {
            id: StateId::next(),
            enabled,
            clear_depth: 1.0,
            compare,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorBufferCore {
    pub id: StateId,
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: wgpu::ColorWrites,
}

impl ColorBufferCore {
    #[must_use]
    pub fn new(blend: Option<wgpu::BlendState>) -> Self {
        Self {
            id: StateId::next(),
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewCore {
    pub id: StateId,
    pub scissor_test: bool,
}

impl ViewCore {
    #[must_use]
    pub fn new(scissor_test: bool) -> Self {
        Self {
            id: StateId::next(),
            scissor_test,
        }
    }
}

impl_plain_core!(
    StageCore,
    LayerCore,
    EnableCore,
    FlagsCore,
    TagCore,
    NameCore,
    RenderTargetCore,
    ModelTransformCore,
    ViewTransformCore,
    ProjectionCore,
    MaterialCore,
    ShaderParamsCore,
    StyleCore,
    DepthBufferCore,
    ColorBufferCore,
    ViewCore,
);

impl_hashed_core!(TextureCore, CubemapCore, ClipsCore, ShaderCore);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_hash_ignores_plane_placement() {
        let a = ClipsCore::new([Clip {
            normal: Vec3::X,
            distance: 1.0,
            mode: ClipMode::Inside,
        }]);
        let b = ClipsCore::new([Clip {
            normal: Vec3::Y,
            distance: -4.0,
            mode: ClipMode::Inside,
        }]);
        assert_ne!(a.id, b.id);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_clip_hash_tracks_count() {
        let clip = Clip {
            normal: Vec3::X,
            distance: 0.0,
            mode: ClipMode::Outside,
        };
        assert_ne!(ClipsCore::new([clip]).hash, ClipsCore::new([clip, clip]).hash);
    }
}

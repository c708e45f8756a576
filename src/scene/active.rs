//! Snapshot of the active core of every kind at compile time.

use super::cores::{
    ClipsCore, ColorBufferCore, CubemapCore, DepthBufferCore, EnableCore, FlagsCore, LayerCore,
    MaterialCore, ModelTransformCore, NameCore, ProjectionCore, RenderTargetCore,
    ShaderCore, ShaderParamsCore, StageCore, StyleCore, TagCore, TextureCore, ViewCore,
    ViewTransformCore,
};
use super::geometry::{GeometryCore, MorphGeometryCore};
use super::light::LightsCore;
use super::state::CoreRef;

/// The cores active for one object while the host traverses its scene graph.
///
/// Every field defaults to [`CoreRef::Absent`].
#[derive(Debug, Clone, Default)]
pub struct ActiveCores {
    // ─── Ordering & Visibility ───
    pub stage: CoreRef<StageCore>,
    pub layer: CoreRef<LayerCore>,
    pub render_target: CoreRef<RenderTargetCore>,
    pub enable: CoreRef<EnableCore>,
    pub flags: CoreRef<FlagsCore>,
    pub tag: CoreRef<TagCore>,
    pub name: CoreRef<NameCore>,

    // ─── Transforms ───
    pub model_transform: CoreRef<ModelTransformCore>,
    pub view_transform: CoreRef<ViewTransformCore>,
    pub projection: CoreRef<ProjectionCore>,

    // ─── Shading ───
    pub geometry: CoreRef<GeometryCore>,
    pub morph_geometry: CoreRef<MorphGeometryCore>,
    pub shader: CoreRef<ShaderCore>,
    pub shader_params: CoreRef<ShaderParamsCore>,
    pub lights: CoreRef<LightsCore>,
    pub material: CoreRef<MaterialCore>,
    pub texture: CoreRef<TextureCore>,
    pub cubemap: CoreRef<CubemapCore>,
    pub clips: CoreRef<ClipsCore>,

    // ─── Fixed Function ───
    pub style: CoreRef<StyleCore>,
    pub depth_buffer: CoreRef<DepthBufferCore>,
    pub color_buffer: CoreRef<ColorBufferCore>,
    pub view: CoreRef<ViewCore>,
}

/// The shader-relevant cores of one object.
///
/// Owned (the fields are shared `Arc`s) so the program cache can keep a copy
/// and recompile after a context loss.
#[derive(Debug, Clone, Default)]
pub struct ShaderCores {
    pub geometry: CoreRef<GeometryCore>,
    pub shader: CoreRef<ShaderCore>,
    pub clips: CoreRef<ClipsCore>,
    pub morph_geometry: CoreRef<MorphGeometryCore>,
    pub texture: CoreRef<TextureCore>,
    pub cubemap: CoreRef<CubemapCore>,
    pub lights: CoreRef<LightsCore>,
}

impl ActiveCores {
    #[must_use]
    pub fn shader_cores(&self) -> ShaderCores {
        ShaderCores {
            geometry: self.geometry.clone(),
            shader: self.shader.clone(),
            clips: self.clips.clone(),
            morph_geometry: self.morph_geometry.clone(),
            texture: self.texture.clone(),
            cubemap: self.cubemap.clone(),
            lights: self.lights.clone(),
        }
    }
}

//! State cores consumed by the display scheduler
//!
//! The component layer produces immutable-per-version cores:
//! - `state`: identities, shader hashes and [`CoreRef`]
//! - `cores`: transforms, materials, flags, targets and fixed-function state
//! - `light`: light lists and ambient derivation
//! - `geometry`: geometry, morph targets and primitive parsing
//! - `active`: the per-object snapshot handed to compilation

pub mod active;
pub mod cores;
pub mod geometry;
pub mod light;
pub mod state;

pub use active::{ActiveCores, ShaderCores};
pub use cores::{
    Clip, ClipMode, ClipsCore, ColorBufferCore, CubemapCore, DepthBufferCore, EnableCore,
    FlagsCore, LayerCore, MaterialCore, ModelTransformCore, NameCore, ProjectionCore,
    RenderTargetBinding, RenderTargetCore, RenderTargetKind, ShaderCore, ShaderParamList,
    ShaderParamsCore, StageCore, StyleCore, TagCore, TextureApplyTo, TextureCore, TextureLayer,
    ViewCore, ViewTransformCore,
};
pub use geometry::{
    BuiltGeometry, GeometryCore, GeometryDesc, MorphGeometryCore, Primitive, VertexAttributes,
};
pub use light::{DirectionalLight, Light, LightKind, LightsCore, PointLight, derive_ambient};
pub use state::{CoreRef, ShaderHash, StateCore, StateId};

//! State Chunks
//!
//! A chunk binds one piece of state to the device, separately for the image
//! pass and the pick pass. Every render object owns one chunk slot per
//! [`ChunkKind`]; the slot index doubles as the run-length dedup key when
//! draw lists are built, so the order of [`ChunkKind::ALL`] is significant.
//!
//! | Slot | Kind                | Program-scoped | Draw | Pick | Unique |
//! |------|---------------------|----------------|------|------|--------|
//! | 0    | Program             | yes            | ✅   | ✅   |        |
//! | 1    | ModelTransform      | yes            | ✅   | ✅   |        |
//! | 2    | ViewTransform       | yes            | ✅   | ✅   |        |
//! | 3    | ProjectionTransform | yes            | ✅   | ✅   |        |
//! | 4    | Flags               |                | ✅   | ✅   |        |
//! | 5    | Shader              | yes            | ✅   | ✅   |        |
//! | 6    | ShaderParams        | yes            | ✅   |      |        |
//! | 7    | Style               |                | ✅   | ✅   |        |
//! | 8    | DepthBuffer         |                | ✅   | ✅   |        |
//! | 9    | ColorBuffer         |                | ✅   |      |        |
//! | 10   | View                |                | ✅   | ✅   |        |
//! | 11   | Name                | yes            |      | ✅   |        |
//! | 12   | Lights              | yes            | ✅   |      |        |
//! | 13   | Material            | yes            | ✅   |      |        |
//! | 14   | Texture             | yes            | ✅   |      |        |
//! | 15   | Cubemap             | yes            | ✅   |      |        |
//! | 16   | Clips               | yes            | ✅   | ✅   |        |
//! | 17   | Geometry (+ morph)  | yes            | ✅   | ✅   |        |
//! | 18   | Draw                | yes            | ✅   | ✅   | ✅     |

mod bind;
mod cache;

pub use bind::BindContext;
pub use cache::{ChunkCache, ChunkHandle};

use std::fmt;
use std::sync::Arc;

use crate::renderer::pipeline::ProgramId;
use crate::scene::{
    ClipsCore, ColorBufferCore, CubemapCore, DepthBufferCore, FlagsCore, GeometryCore,
    LightsCore, MaterialCore, ModelTransformCore, MorphGeometryCore, NameCore, ProjectionCore,
    ShaderCore, ShaderParamsCore, StateId, StyleCore, TextureCore, ViewCore, ViewTransformCore,
};

/// Number of chunk slots per render object.
pub const SLOT_COUNT: usize = 19;

/// Chunk slot kinds in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ChunkKind {
    Program = 0,
    ModelTransform,
    ViewTransform,
    ProjectionTransform,
    Flags,
    Shader,
    ShaderParams,
    Style,
    DepthBuffer,
    ColorBuffer,
    View,
    Name,
    Lights,
    Material,
    Texture,
    Cubemap,
    Clips,
    Geometry,
    Draw,
}

impl ChunkKind {
    pub const ALL: [Self; SLOT_COUNT] = [
        Self::Program,
        Self::ModelTransform,
        Self::ViewTransform,
        Self::ProjectionTransform,
        Self::Flags,
        Self::Shader,
        Self::ShaderParams,
        Self::Style,
        Self::DepthBuffer,
        Self::ColorBuffer,
        Self::View,
        Self::Name,
        Self::Lights,
        Self::Material,
        Self::Texture,
        Self::Cubemap,
        Self::Clips,
        Self::Geometry,
        Self::Draw,
    ];

    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Whether the chunk key omits the program id.
    #[inline]
    #[must_use]
    pub const fn program_independent(self) -> bool {
        matches!(
            self,
            Self::Flags | Self::Style | Self::DepthBuffer | Self::ColorBuffer | Self::View
        )
    }

    /// Participates in the image list.
    #[inline]
    #[must_use]
    pub const fn draw(self) -> bool {
        !matches!(self, Self::Name)
    }

    /// Participates in the pick list.
    #[inline]
    #[must_use]
    pub const fn pick(self) -> bool {
        !matches!(
            self,
            Self::ShaderParams
                | Self::ColorBuffer
                | Self::Lights
                | Self::Material
                | Self::Texture
                | Self::Cubemap
        )
    }

    /// Never deduplicated against the previous identical key.
    #[inline]
    #[must_use]
    pub const fn unique(self) -> bool {
        matches!(self, Self::Draw)
    }

    /// Diagnostic tag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::ModelTransform => "xform",
            Self::ViewTransform => "lookAt",
            Self::ProjectionTransform => "camera",
            Self::Flags => "flags",
            Self::Shader => "shader",
            Self::ShaderParams => "shaderParams",
            Self::Style => "style",
            Self::DepthBuffer => "depthBuffer",
            Self::ColorBuffer => "colorBuffer",
            Self::View => "view",
            Self::Name => "name",
            Self::Lights => "lights",
            Self::Material => "material",
            Self::Texture => "texture",
            Self::Cubemap => "cubemap",
            Self::Clips => "clips",
            Self::Geometry => "geometry",
            Self::Draw => "draw",
        }
    }
}

/// Structured chunk identity.
///
/// The slot is always part of the key so one core bound at two slots never
/// collides, and the program is part of it for program-scoped kinds so that
/// uniforms are re-sent whenever the bound program changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub kind: ChunkKind,
    pub program: Option<ProgramId>,
    pub core: Option<StateId>,
    pub secondary: Option<StateId>,
}

impl ChunkKey {
    /// Key of the chunk binding `program` itself.
    #[must_use]
    pub fn program(program: ProgramId) -> Self {
        Self {
            kind: ChunkKind::Program,
            program: Some(program),
            core: None,
            secondary: None,
        }
    }

    /// Key of a core-backed chunk; drops `program` for program-independent kinds.
    #[must_use]
    pub fn core(
        kind: ChunkKind,
        program: Option<ProgramId>,
        core: StateId,
        secondary: Option<StateId>,
    ) -> Self {
        Self {
            kind,
            program: if kind.program_independent() {
                None
            } else {
                program
            },
            core: Some(core),
            secondary,
        }
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> usize {
        self.kind.slot()
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__", self.slot())?;
        match self.program {
            Some(program) => write!(f, "p{program}_")?,
            None => f.write_str("_")?,
        }
        if let Some(core) = self.core {
            write!(f, "{core}")?;
        }
        if let Some(secondary) = self.secondary {
            write!(f, "__{secondary}")?;
        }
        Ok(())
    }
}

/// State carried by a chunk.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Program(ProgramId),
    ModelTransform(Arc<ModelTransformCore>),
    ViewTransform(Arc<ViewTransformCore>),
    ProjectionTransform(Arc<ProjectionCore>),
    Flags(Arc<FlagsCore>),
    Shader(Arc<ShaderCore>),
    ShaderParams(Arc<ShaderParamsCore>),
    Style(Arc<StyleCore>),
    DepthBuffer(Arc<DepthBufferCore>),
    ColorBuffer(Arc<ColorBufferCore>),
    View(Arc<ViewCore>),
    Name(Arc<NameCore>),
    Lights(Arc<LightsCore>),
    Material(Arc<MaterialCore>),
    Texture(Arc<TextureCore>),
    Cubemap(Arc<CubemapCore>),
    Clips(Arc<ClipsCore>),
    Geometry {
        geometry: Arc<GeometryCore>,
        morph: Option<Arc<MorphGeometryCore>>,
    },
    Draw(Arc<GeometryCore>),
}

impl ChunkPayload {
    #[must_use]
    pub fn kind(&self) -> ChunkKind {
        match self {
            Self::Program(_) => ChunkKind::Program,
            Self::ModelTransform(_) => ChunkKind::ModelTransform,
            Self::ViewTransform(_) => ChunkKind::ViewTransform,
            Self::ProjectionTransform(_) => ChunkKind::ProjectionTransform,
            Self::Flags(_) => ChunkKind::Flags,
            Self::Shader(_) => ChunkKind::Shader,
            Self::ShaderParams(_) => ChunkKind::ShaderParams,
            Self::Style(_) => ChunkKind::Style,
            Self::DepthBuffer(_) => ChunkKind::DepthBuffer,
            Self::ColorBuffer(_) => ChunkKind::ColorBuffer,
            Self::View(_) => ChunkKind::View,
            Self::Name(_) => ChunkKind::Name,
            Self::Lights(_) => ChunkKind::Lights,
            Self::Material(_) => ChunkKind::Material,
            Self::Texture(_) => ChunkKind::Texture,
            Self::Cubemap(_) => ChunkKind::Cubemap,
            Self::Clips(_) => ChunkKind::Clips,
            Self::Geometry { .. } => ChunkKind::Geometry,
            Self::Draw(_) => ChunkKind::Draw,
        }
    }
}

/// A shared, reference-counted binding unit.
#[derive(Debug)]
pub struct Chunk {
    pub key: ChunkKey,
    pub payload: ChunkPayload,
    ref_count: u32,
}

impl Chunk {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChunkKind {
        self.key.kind
    }

    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

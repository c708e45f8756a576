//! Structured program cache keys.
//!
//! A program is identified by the shader hashes of the seven cores that can
//! change generated shader text, in a fixed order:
//!
//! | Field            | Source core            |
//! |------------------|------------------------|
//! | `geometry`       | [`GeometryCore`]       |
//! | `shader`         | [`ShaderCore`]         |
//! | `clips`          | [`ClipsCore`]          |
//! | `morph_geometry` | [`MorphGeometryCore`]  |
//! | `texture`        | [`TextureCore`]        |
//! | `cubemap`        | [`CubemapCore`]        |
//! | `lights`         | [`LightsCore`]         |
//!
//! Absent and empty cores contribute `None`, so "no clips" and "zero clips"
//! share a program.
//!
//! [`GeometryCore`]: crate::scene::GeometryCore
//! [`ShaderCore`]: crate::scene::ShaderCore
//! [`ClipsCore`]: crate::scene::ClipsCore
//! [`MorphGeometryCore`]: crate::scene::MorphGeometryCore
//! [`TextureCore`]: crate::scene::TextureCore
//! [`CubemapCore`]: crate::scene::CubemapCore
//! [`LightsCore`]: crate::scene::LightsCore

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::scene::{ShaderCores, ShaderHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramKey {
    pub geometry: Option<ShaderHash>,
    pub shader: Option<ShaderHash>,
    pub clips: Option<ShaderHash>,
    pub morph_geometry: Option<ShaderHash>,
    pub texture: Option<ShaderHash>,
    pub cubemap: Option<ShaderHash>,
    pub lights: Option<ShaderHash>,
}

impl ProgramKey {
    #[must_use]
    pub fn from_cores(cores: &ShaderCores) -> Self {
        Self {
            geometry: cores.geometry.shader_hash(),
            shader: cores.shader.shader_hash(),
            clips: cores.clips.shader_hash(),
            morph_geometry: cores.morph_geometry.shader_hash(),
            texture: cores.texture.shader_hash(),
            cubemap: cores.cubemap.shader_hash(),
            lights: cores.lights.shader_hash(),
        }
    }

    /// Single 64-bit digest, used in diagnostics.
    #[inline]
    #[must_use]
    pub fn digest(&self) -> u64 {
        fx_hash_key(self)
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{:016x}", self.digest())
    }
}

/// Which variant of a program is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramMode {
    /// Shaded variant used by the image list.
    Draw,
    /// Flat pick-colour / packed-depth variant used by the pick list.
    Pick,
}

/// Everything a device needs to build one program variant.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub key: &'a ProgramKey,
    pub mode: ProgramMode,
    pub cores: &'a ShaderCores,
}

/// Computes an `FxHash` of an arbitrary hashable key.
#[inline]
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

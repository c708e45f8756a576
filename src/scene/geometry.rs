//! Geometry cores.
//!
//! [`GeometryDesc`] is the loose form handed over by asset loaders;
//! [`GeometryDesc::build`] validates it into an immutable [`GeometryCore`],
//! reporting any primitive fallback alongside the built core.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::state::{ShaderHash, StateCore, StateId};
use crate::errors::{DisplayError, Result};
use crate::renderer::device::GeometryHandle;

/// Drawable primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Primitive {
    /// Parses a primitive name.
    ///
    /// `line-loop` and `triangle-fan` have no topology equivalent and are
    /// rejected together with unknown names.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "points" => Ok(Self::Points),
            "lines" => Ok(Self::Lines),
            "line-strip" => Ok(Self::LineStrip),
            "triangles" => Ok(Self::Triangles),
            "triangle-strip" => Ok(Self::TriangleStrip),
            other => Err(DisplayError::UnsupportedPrimitive(other.to_string())),
        }
    }

    /// Like [`Primitive::parse`], falling back to triangles with a warning.
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|err| {
            log::warn!("{err}; falling back to triangles");
            Self::Triangles
        })
    }

    #[must_use]
    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            Self::Points => wgpu::PrimitiveTopology::PointList,
            Self::Lines => wgpu::PrimitiveTopology::LineList,
            Self::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Self::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Self::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineStrip => "line-strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
        }
    }
}

bitflags! {
    /// Optional vertex attributes present in a geometry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexAttributes: u8 {
        const NORMALS = 1 << 0;
        const UV      = 1 << 1;
        const UV2     = 1 << 2;
        const COLORS  = 1 << 3;
    }
}

/// Unvalidated geometry description.
#[derive(Debug, Clone, Default)]
pub struct GeometryDesc {
    pub primitive: Option<String>,
    pub buffers: Option<GeometryHandle>,
    pub element_count: Option<u32>,
    pub indexed: bool,
    pub attributes: VertexAttributes,
}

/// A validated geometry plus the diagnostic of a primitive fallback.
#[derive(Debug)]
pub struct BuiltGeometry {
    pub core: GeometryCore,
    /// [`DisplayError::UnsupportedPrimitive`] when triangles replaced the
    /// requested primitive.
    pub fallback: Option<DisplayError>,
}

impl GeometryDesc {
    /// Validates the description.
    ///
    /// Missing buffers or element counts are errors. An unsupported primitive
    /// name builds with triangles and returns the parse error in
    /// [`BuiltGeometry::fallback`].
    pub fn build(self) -> Result<BuiltGeometry> {
        let id = StateId::next();
        let buffers = self.buffers.ok_or(DisplayError::MissingGeometryField {
            geometry: id,
            field: "buffers",
        })?;
        let element_count = self.element_count.ok_or(DisplayError::MissingGeometryField {
            geometry: id,
            field: "element_count",
        })?;
        let (primitive, fallback) = match self.primitive.as_deref().map(Primitive::parse) {
            None => (Primitive::Triangles, None),
            Some(Ok(primitive)) => (primitive, None),
            Some(Err(err)) => {
                log::warn!("{err}; geometry {id} falls back to triangles");
                (Primitive::Triangles, Some(err))
            }
        };

        Ok(BuiltGeometry {
            core: GeometryCore::with_id(
                id,
                primitive,
                buffers,
                element_count,
                self.indexed,
                self.attributes,
            ),
            fallback,
        })
    }
}

/// Validated geometry ready to draw.
#[derive(Debug, Clone)]
pub struct GeometryCore {
    pub id: StateId,
    pub primitive: Primitive,
    pub buffers: GeometryHandle,
    pub element_count: u32,
    pub indexed: bool,
    pub attributes: VertexAttributes,
    pub hash: ShaderHash,
}

impl GeometryCore {
    #[must_use]
    pub fn new(
        primitive: Primitive,
        buffers: GeometryHandle,
        element_count: u32,
        indexed: bool,
        attributes: VertexAttributes,
    ) -> Self {
        Self::with_id(
            StateId::next(),
            primitive,
            buffers,
            element_count,
            indexed,
            attributes,
        )
    }

    fn with_id(
        id: StateId,
        primitive: Primitive,
        buffers: GeometryHandle,
        element_count: u32,
        indexed: bool,
        attributes: VertexAttributes,
    ) -> Self {
        let hash = ShaderHash::of_descriptor(&format!(
            "geo:{}:{:02x}",
            primitive.tag(),
            attributes.bits()
        ));
        Self {
            id,
            primitive,
            buffers,
            element_count,
            indexed,
            attributes,
            hash,
        }
    }
}

/// Morph targets blended over a base geometry.
#[derive(Debug, Clone)]
pub struct MorphGeometryCore {
    pub id: StateId,
    pub targets: SmallVec<[GeometryHandle; 4]>,
    pub factor: f32,
    pub hash: ShaderHash,
}

impl MorphGeometryCore {
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = GeometryHandle>, factor: f32) -> Self {
        let targets: SmallVec<[GeometryHandle; 4]> = targets.into_iter().collect();
        Self {
            id: StateId::next(),
            hash: ShaderHash::of_descriptor(&format!("morph:{}", targets.len())),
            targets,
            factor,
        }
    }
}

impl StateCore for GeometryCore {
    #[inline]
    fn state_id(&self) -> StateId {
        self.id
    }

    #[inline]
    fn shader_hash(&self) -> Option<ShaderHash> {
        Some(self.hash)
    }
}

impl StateCore for MorphGeometryCore {
    #[inline]
    fn state_id(&self) -> StateId {
        self.id
    }

    #[inline]
    fn shader_hash(&self) -> Option<ShaderHash> {
        Some(self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_primitives() {
        assert_eq!(Primitive::parse("points").ok(), Some(Primitive::Points));
        assert_eq!(
            Primitive::parse("triangle-strip").ok(),
            Some(Primitive::TriangleStrip)
        );
    }

    #[test]
    fn test_parse_rejects_fan_and_loop() {
        assert!(matches!(
            Primitive::parse("triangle-fan"),
            Err(DisplayError::UnsupportedPrimitive(name)) if name == "triangle-fan"
        ));
        assert!(Primitive::parse("line-loop").is_err());
    }

    #[test]
    fn test_parse_or_default_falls_back_to_triangles() {
        assert_eq!(Primitive::parse_or_default("quads"), Primitive::Triangles);
    }

    #[test]
    fn test_build_reports_missing_buffers() {
        let desc = GeometryDesc {
            element_count: Some(3),
            ..GeometryDesc::default()
        };
        assert!(matches!(
            desc.build(),
            Err(DisplayError::MissingGeometryField { field: "buffers", .. })
        ));
    }

    #[test]
    fn test_build_with_unknown_primitive_uses_triangles() {
        let desc = GeometryDesc {
            primitive: Some("polygon".into()),
            buffers: Some(GeometryHandle(7)),
            element_count: Some(6),
            indexed: true,
            attributes: VertexAttributes::NORMALS,
        };
        let built = desc.build().unwrap();
        assert_eq!(built.core.primitive, Primitive::Triangles);
        assert_eq!(built.core.element_count, 6);
        assert!(matches!(
            built.fallback,
            Some(DisplayError::UnsupportedPrimitive(name)) if name == "polygon"
        ));
    }

    #[test]
    fn test_geometry_hash_ignores_buffers() {
        let a = GeometryCore::new(
            Primitive::Triangles,
            GeometryHandle(1),
            3,
            false,
            VertexAttributes::NORMALS,
        );
        let b = GeometryCore::new(
            Primitive::Triangles,
            GeometryHandle(2),
            300,
            true,
            VertexAttributes::NORMALS,
        );
        assert_eq!(a.hash, b.hash);
    }
}

use glam::Vec3;
use smallvec::SmallVec;

use super::state::{ShaderHash, StateCore, StateId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Constant, linear, quadratic attenuation.
    pub attenuation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
}

/// Light kinds understood by generated programs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional(DirectionalLight),
    Point(PointLight),
}

impl LightKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Ambient => "amb",
            Self::Directional(_) => "dir",
            Self::Point(_) => "point",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub diffuse: bool,
    pub specular: bool,
    pub kind: LightKind,
}

impl Light {
    #[must_use]
    pub fn ambient(color: Vec3) -> Self {
        Self {
            color,
            diffuse: false,
            specular: false,
            kind: LightKind::Ambient,
        }
    }

    #[must_use]
    pub fn directional(color: Vec3, direction: Vec3) -> Self {
        Self {
            color,
            diffuse: true,
            specular: true,
            kind: LightKind::Directional(DirectionalLight { direction }),
        }
    }

    #[must_use]
    pub fn point(color: Vec3, position: Vec3) -> Self {
        Self {
            color,
            diffuse: true,
            specular: true,
            kind: LightKind::Point(PointLight {
                position,
                attenuation: Vec3::new(1.0, 0.0, 0.0),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, LightKind::Ambient)
    }
}

/// Active light list. The hash covers the ordered light kinds only, so
/// moving or recolouring a light never forces a program rebuild.
#[derive(Debug, Clone)]
pub struct LightsCore {
    pub id: StateId,
    pub lights: SmallVec<[Light; 4]>,
    pub hash: ShaderHash,
}

impl LightsCore {
    #[must_use]
    pub fn new(lights: impl IntoIterator<Item = Light>) -> Self {
        let lights: SmallVec<[Light; 4]> = lights.into_iter().collect();
        let kinds = lights
            .iter()
            .map(|light| light.kind.tag())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            id: StateId::next(),
            hash: ShaderHash::of_descriptor(&format!("lights:{kinds}")),
            lights,
        }
    }
}

impl StateCore for LightsCore {
    #[inline]
    fn state_id(&self) -> StateId {
        self.id
    }

    #[inline]
    fn shader_hash(&self) -> Option<ShaderHash> {
        Some(self.hash)
    }
}

/// Colour of the first ambient light in `core`, if any.
///
/// The display stores the result as its clear colour when a lights core is
/// bound during compilation.
#[must_use]
pub fn derive_ambient(core: &LightsCore) -> Option<Vec3> {
    core.lights
        .iter()
        .find(|light| light.is_ambient())
        .map(|light| light.color)
}

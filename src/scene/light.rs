use glam::Vec3;
use smallvec::SmallVec;

use crate::math::Color;
use crate::scene::NodeHandle;

/// Light variant payloads.
///
/// Directional lights shine along their node's local -Z axis; point lights
/// radiate from the node position with linear falloff to `range`; ambient
/// lights are position-independent.
#[derive(Debug, Clone)]
pub enum LightKind {
    Directional,
    Point { range: f32 },
    Ambient,
}

/// A light component carried by a scene node.
#[derive(Debug, Clone)]
pub struct Light {
    pub color: Color,
    pub energy: f32,
    pub on: bool,
    pub kind: LightKind,

    // World-space state cached by begin_render each frame.
    pub(crate) cached_position: Vec3,
    pub(crate) cached_direction: Vec3,
}

impl Light {
    #[must_use]
    pub fn new_directional(color: Color, energy: f32) -> Self {
        Self::new(color, energy, LightKind::Directional)
    }

    #[must_use]
    pub fn new_point(color: Color, energy: f32, range: f32) -> Self {
        Self::new(color, energy, LightKind::Point { range })
    }

    #[must_use]
    pub fn new_ambient(color: Color, energy: f32) -> Self {
        Self::new(color, energy, LightKind::Ambient)
    }

    fn new(color: Color, energy: f32, kind: LightKind) -> Self {
        Self {
            color,
            energy,
            on: true,
            kind,
            cached_position: Vec3::ZERO,
            cached_direction: Vec3::NEG_Z,
        }
    }

    /// Caches world-space position and direction for the coming frame.
    pub(crate) fn begin_render(&mut self, world: glam::Mat4) {
        self.cached_position = world.transform_point3(Vec3::ZERO);
        self.cached_direction = world.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
    }
}

/// Restricts a model to a subset of the scene's lights.
///
/// A model without a light group is lit by every active light reachable
/// from the render roots.
#[derive(Debug, Clone, Default)]
pub struct LightGroup {
    pub lights: SmallVec<[NodeHandle; 4]>,
    pub active: bool,
}

impl LightGroup {
    #[must_use]
    pub fn new(lights: impl IntoIterator<Item = NodeHandle>) -> Self {
        Self {
            lights: lights.into_iter().collect(),
            active: true,
        }
    }

    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.lights.contains(&handle)
    }
}

//! Per-vertex light accumulation.
//!
//! Lights are scene nodes; before a frame the renderer resolves each
//! active light's world-space state (the light's `begin_render` hook) and
//! accumulates contributions per vertex in world space. A model's
//! [`LightGroup`] restricts which lights apply to it.

use glam::Vec3;
use smallvec::SmallVec;

use crate::math::Color;
use crate::scene::{LightGroup, LightKind, NodeHandle, NodeKind, Scene};

/// A light resolved into world space for the current frame.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResolvedLight {
    Ambient,
    Directional { direction: Vec3 },
    Point { position: Vec3, range: f32 },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveLight {
    pub handle: NodeHandle,
    pub color: Color,
    pub energy: f32,
    pub kind: ResolvedLight,
}

/// The frame's active lights plus the world ambient term.
#[derive(Debug, Default)]
pub(crate) struct FrameLights {
    pub lights: SmallVec<[ActiveLight; 8]>,
    pub ambient: Color,
}

/// Resolves every active light reachable from `roots`, caching world-space
/// state on the light components as it goes.
pub(crate) fn collect_lights(scene: &mut Scene, roots: &[NodeHandle]) -> FrameLights {
    let mut handles: SmallVec<[NodeHandle; 8]> = SmallVec::new();
    for &root in roots {
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = scene.get(handle) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            if let NodeKind::Light(light) = &node.kind {
                if light.on && light.energy > 0.0 {
                    handles.push(handle);
                }
            }
        }
    }

    let mut lights = SmallVec::new();
    for handle in handles {
        let world = scene.world_matrix(handle);
        let Some(light) = scene.get_mut(handle).and_then(|n| n.light_mut()) else {
            continue;
        };
        light.begin_render(world);
        let kind = match light.kind {
            LightKind::Ambient => ResolvedLight::Ambient,
            LightKind::Directional => ResolvedLight::Directional {
                direction: light.cached_direction,
            },
            LightKind::Point { range } => ResolvedLight::Point {
                position: light.cached_position,
                range,
            },
        };
        lights.push(ActiveLight {
            handle,
            color: light.color,
            energy: light.energy,
            kind,
        });
    }

    let ambient = scene.world.ambient_color * scene.world.ambient_energy;
    FrameLights { lights, ambient }
}

impl FrameLights {
    /// Accumulated light color for a world-space vertex.
    #[must_use]
    pub(crate) fn accumulate(
        &self,
        group: Option<&LightGroup>,
        position: Vec3,
        normal: Vec3,
    ) -> Color {
        let mut total = self.ambient;
        total.a = 1.0;
        for light in &self.lights {
            if let Some(group) = group {
                if group.active && !group.contains(light.handle) {
                    continue;
                }
            }
            let factor = match light.kind {
                ResolvedLight::Ambient => 1.0,
                ResolvedLight::Directional { direction } => normal.dot(-direction).max(0.0),
                ResolvedLight::Point { position: lp, range } => {
                    let to_light = lp - position;
                    let dist = to_light.length();
                    if dist >= range || range <= 0.0 {
                        0.0
                    } else {
                        // Linear falloff to zero at the configured range.
                        let attenuation = 1.0 - dist / range;
                        attenuation * normal.dot(to_light / dist.max(1e-6)).max(0.0)
                    }
                }
            };
            if factor > 0.0 {
                let contribution = light.color * (light.energy * factor);
                total.r += contribution.r;
                total.g += contribution.g;
                total.b += contribution.b;
            }
        }
        total
    }
}

/// Bakes the current dynamic lighting into a mesh vertex color channel.
///
/// The channel is created when missing. After baking, set the model's
/// `baked_light_channel` so rendering reads the channel instead of running
/// the lights again. Shared meshes are copied on write.
pub fn bake_lighting(scene: &mut Scene, model_handle: NodeHandle, channel: usize) -> Option<usize> {
    let channel = channel.min(crate::resources::mesh::MAX_COLOR_CHANNELS - 1);
    let roots = scene.roots().to_vec();
    let lights = collect_lights(scene, &roots);
    let world = scene.world_matrix(model_handle);
    let normal_matrix = glam::Mat3::from_mat4(world);

    let node = scene.get_mut(model_handle)?;
    let model = node.model_mut()?;
    let light_group = model.light_group.clone();
    let mesh = std::sync::Arc::make_mut(&mut model.mesh);

    while mesh.vertices.colors.len() <= channel {
        mesh.add_color_channel(Color::WHITE);
    }

    for i in 0..mesh.vertices.positions.len() {
        let position = world.transform_point3(mesh.vertices.positions[i]);
        let normal = (normal_matrix * mesh.vertices.normals[i]).normalize_or_zero();
        mesh.vertices.colors[channel][i] =
            lights.accumulate(light_group.as_ref(), position, normal);
    }
    Some(channel)
}

//! The camera render pipeline.
//!
//! [`Renderer::render`] drives the per-frame loop: clear targets, collect
//! frustum-visible models into opaque and transparent buckets, process
//! vertices (skinning, hooks, billboarding, projection, snapping), reject
//! and depth-sort triangles per mesh part, emit them through the scanline
//! rasterizer, then composite fog and run material post shaders.
//!
//! The renderer owns all mutable scratch state, so meshes stay immutable
//! during a render and a single renderer can serve any number of scenes
//! (one render at a time).

pub mod lighting;
pub mod rasterizer;

pub use lighting::bake_lighting;
pub use rasterizer::{draw_triangles, DrawOptions, DrawVertex};

pub use crate::errors::MAX_BATCH_TRIANGLES;

use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
use log::debug;
use rustc_hash::FxHashMap;

use crate::math::{safe_inverse, Color, Dimensions};
use crate::resources::material::{BillboardMode, ImageShader, Material, TriangleSort};
use crate::resources::mesh::Mesh;
use crate::resources::world::FogMode;
use crate::scene::{Camera, Frustum, Model, Node, NodeHandle, Scene};

const MIN_W: f32 = 1e-5;

#[derive(Debug, Clone, Copy)]
struct SortEntry {
    depth: f32,
    tri: u32,
}

/// Per-render scratch buffers, sized to the current mesh's vertex count.
#[derive(Default)]
struct Scratch {
    /// World-space positions after skinning and vertex hooks.
    world_pos: Vec<Vec3>,
    /// World-space normals after skinning.
    world_nrm: Vec<Vec3>,
    /// Positions used for projection this part (billboarded when active).
    frame_pos: Vec<Vec3>,
    clip: Vec<Vec4>,
    ndc: Vec<Vec2>,
    screen: Vec<Vec2>,
    /// Per-vertex view-space distance, used for depth and behind-camera
    /// rejection.
    depths: Vec<f32>,
    lit: Vec<Color>,
    bucket: Vec<SortEntry>,
    joints: Vec<Mat4>,
}

struct FrameContext {
    view: Mat4,
    projection: Mat4,
    cam_pos: Vec3,
    cam_rotation: Quat,
    vertex_snap: Option<f32>,
    lighting_on: bool,
}

struct RenderItem {
    handle: NodeHandle,
    world: Mat4,
    distance: f32,
    transparent: bool,
}

/// Renders scenes through camera nodes into their back buffers.
pub struct Renderer {
    scratch: Scratch,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scratch: Scratch::default(),
        }
    }

    /// Renders the whole scene through `camera_handle`.
    ///
    /// # Panics
    ///
    /// Panics when `camera_handle` is not a camera node; that is a
    /// programmer error, not a runtime condition.
    pub fn render(&mut self, scene: &mut Scene, camera_handle: NodeHandle) {
        let roots = scene.roots().to_vec();
        self.render_roots(scene, camera_handle, &roots);
    }

    /// Renders only the subtrees under `roots`.
    pub fn render_roots(&mut self, scene: &mut Scene, camera_handle: NodeHandle, roots: &[NodeHandle]) {
        let cam_world = scene.world_matrix(camera_handle);
        let mut camera = scene
            .take_camera(camera_handle)
            .expect("render target must be a camera node");
        self.draw_frame(scene, &mut camera, cam_world, roots);
        scene.restore_camera(camera_handle, camera);
    }

    fn draw_frame(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        cam_world: Mat4,
        roots: &[NodeHandle],
    ) {
        camera.clear(scene.world.clear_color);

        let view = safe_inverse(cam_world);
        let projection = camera.projection();
        let frustum = Frustum::from_matrix(projection * view);
        let (_, cam_rotation, _) = crate::math::decompose(cam_world);
        let ctx = FrameContext {
            view,
            projection,
            cam_pos: cam_world.w_axis.truncate(),
            cam_rotation,
            vertex_snap: camera.vertex_snap,
            lighting_on: scene.world.lighting,
        };

        // Sector restriction: when the camera sits inside a sector, only
        // models inside that sector's neighborhood render.
        let mut sector_allowed: Option<Vec<Dimensions>> = None;
        if camera.sector_rendering {
            if let Some(start) = scene.sector_containing(ctx.cam_pos) {
                let hood = scene.sector_neighborhood(start, camera.sector_depth);
                sector_allowed = Some(
                    hood.into_iter()
                        .filter_map(|h| scene.sector_bounds(h))
                        .collect(),
                );
            }
        }

        let lights = if scene.world.lighting {
            lighting::collect_lights(scene, roots)
        } else {
            lighting::FrameLights::default()
        };
        camera.stats.lights_active = lights.lights.len();

        // Collect frustum-visible models, bucketed by transparency.
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for &root in roots {
            let mut stack = vec![root];
            while let Some(handle) = stack.pop() {
                let Some(node) = scene.get(handle) else {
                    continue;
                };
                if !node.visible {
                    continue; // Invisible subtrees are pruned entirely.
                }
                stack.extend(node.children.iter().copied());
                let Some(model) = node.model() else {
                    continue;
                };
                if model.batch_owner().is_some() {
                    continue; // Rendered through the batch owner.
                }
                let radius = model.bounding_radius();
                let local_center = model.mesh.dimensions.center();
                let is_transparent = model
                    .mesh
                    .parts
                    .iter()
                    .any(|p| p.material.is_transparent());

                let world = scene.world_matrix(handle);
                let (_, _, scale) = crate::math::decompose(world);
                let center = world.transform_point3(local_center);
                let world_radius = radius * scale.x.max(scale.y).max(scale.z);

                if !frustum.contains_sphere(center, world_radius) {
                    camera.stats.models_culled += 1;
                    continue;
                }
                if let Some(allowed) = &sector_allowed {
                    let position = world.w_axis.truncate();
                    if !allowed.iter().any(|b| b.contains_point(position)) {
                        camera.stats.models_culled += 1;
                        continue;
                    }
                }

                let item = RenderItem {
                    handle,
                    world,
                    distance: ctx.cam_pos.distance_squared(center),
                    transparent: is_transparent,
                };
                if item.transparent {
                    transparent.push(item);
                } else {
                    opaque.push(item);
                }
            }
        }

        // Opaque and alpha-clip first in collection order; transparent
        // last, farthest first.
        transparent.sort_by(|a, b| b.distance.total_cmp(&a.distance));

        for item in opaque.iter().chain(transparent.iter()) {
            self.draw_model(scene, camera, &lights, &ctx, item);
        }

        apply_fog(camera, scene);
        run_post_shaders(camera, scene, opaque.iter().chain(transparent.iter()));

        debug!(
            "rendered {} models ({} culled), {} triangles ({} skipped), {} lights",
            camera.stats.models_rendered,
            camera.stats.models_culled,
            camera.stats.triangles_rendered,
            camera.stats.triangles_skipped,
            camera.stats.lights_active,
        );
    }

    fn draw_model(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        lights: &lighting::FrameLights,
        ctx: &FrameContext,
        item: &RenderItem,
    ) {
        let Some(model) = scene.get(item.handle).and_then(Node::model).cloned() else {
            return;
        };
        let mesh = model.mesh.clone();
        if mesh.vertices.is_empty() {
            return;
        }

        let skinned = self.prepare_geometry(scene, &mesh, item.world, &model);
        for part_index in 0..mesh.parts.len() {
            let part = &mesh.parts[part_index];
            let range = part.triangle_start..part.triangle_end;
            self.draw_part(camera, lights, ctx, &mesh, &part.material, &model, item.world, skinned, range);
        }

        // Dynamic batch members draw through the owner's chosen material.
        if !model.batch_members().is_empty() {
            let owner_material = mesh
                .parts
                .get(model.batch_part)
                .or_else(|| mesh.parts.first())
                .map(|p| p.material.clone());
            let Some(owner_material) = owner_material else {
                return;
            };
            for &member in model.batch_members() {
                let visible = scene.get(member).is_some_and(|n| n.visible);
                let Some(member_model) = scene.get(member).and_then(Node::model).cloned() else {
                    continue;
                };
                if !visible || member_model.mesh.vertices.is_empty() {
                    continue;
                }
                let member_world = scene.world_matrix(member);
                let member_mesh = member_model.mesh.clone();
                self.prepare_geometry(scene, &member_mesh, member_world, &member_model);
                self.draw_part(
                    camera,
                    lights,
                    ctx,
                    &member_mesh,
                    &owner_material,
                    &member_model,
                    member_world,
                    false,
                    0..member_mesh.triangles.len(),
                );
            }
        }

        camera.stats.models_rendered += 1;
    }

    /// Fills world-space position and normal scratch for a mesh, applying
    /// skinning and the model's vertex hook. Returns whether skinning ran.
    fn prepare_geometry(
        &mut self,
        scene: &mut Scene,
        mesh: &Mesh,
        world: Mat4,
        model: &Model,
    ) -> bool {
        let n = mesh.vertex_count();
        self.scratch.world_pos.resize(n, Vec3::ZERO);
        self.scratch.world_nrm.resize(n, Vec3::ZERO);

        let skinned = model.is_skinned();
        if skinned {
            let skin = model.skin.as_ref().expect("is_skinned checked");
            self.scratch.joints.clear();
            for (j, &joint) in skin.joints.iter().enumerate() {
                let joint_world = scene.world_matrix(joint);
                let inverse_bind = skin
                    .inverse_binds
                    .get(j)
                    .copied()
                    .unwrap_or(Mat4::IDENTITY);
                self.scratch.joints.push(joint_world * inverse_bind);
            }

            for i in 0..n {
                let joints = mesh.vertices.joints[i];
                let weights = mesh.vertices.weights[i];
                let mut skin_matrix = Mat4::ZERO;
                let mut total = 0.0;
                for k in 0..joints.len() {
                    let w = weights[k];
                    if w <= 0.0 {
                        continue;
                    }
                    if let Some(jm) = self.scratch.joints.get(joints[k] as usize) {
                        skin_matrix += *jm * w;
                        total += w;
                    }
                }
                if total <= f32::EPSILON {
                    skin_matrix = world;
                }
                self.scratch.world_pos[i] =
                    skin_matrix.transform_point3(mesh.vertices.positions[i]);
                self.scratch.world_nrm[i] = (Mat3::from_mat4(skin_matrix)
                    * mesh.vertices.normals[i])
                    .normalize_or_zero();
            }
        } else {
            let normal_matrix = Mat3::from_mat4(world);
            for i in 0..n {
                self.scratch.world_pos[i] = world.transform_point3(mesh.vertices.positions[i]);
                self.scratch.world_nrm[i] =
                    (normal_matrix * mesh.vertices.normals[i]).normalize_or_zero();
            }
        }

        if let Some(hook) = &model.vertex_transform {
            for i in 0..n {
                self.scratch.world_pos[i] = hook(i, self.scratch.world_pos[i]);
            }
        }
        skinned
    }

    #[allow(clippy::too_many_lines)]
    fn draw_part(
        &mut self,
        camera: &mut Camera,
        lights: &lighting::FrameLights,
        ctx: &FrameContext,
        mesh: &Mesh,
        material: &Material,
        model: &Model,
        world: Mat4,
        skinned: bool,
        triangles: std::ops::Range<usize>,
    ) {
        let n = mesh.vertex_count();
        let (px_w, px_h) = camera.size();
        let scratch = &mut self.scratch;
        scratch.frame_pos.resize(n, Vec3::ZERO);
        scratch.clip.resize(n, Vec4::ZERO);
        scratch.ndc.resize(n, Vec2::ZERO);
        scratch.screen.resize(n, Vec2::ZERO);
        scratch.depths.resize(n, 0.0);
        scratch.lit.resize(n, Color::WHITE);

        // Billboarding replaces the model's world rotation per part;
        // skinned models are exempt.
        let billboard_world = if skinned {
            None
        } else {
            billboard_matrix(material.billboard, world, ctx)
        };

        for i in 0..n {
            let world_pos = match billboard_world {
                Some(bb) => bb.transform_point3(mesh.vertices.positions[i]),
                None => scratch.world_pos[i],
            };
            scratch.frame_pos[i] = world_pos;

            let view_pos = ctx.view.transform_point3(world_pos);
            let mut clip = ctx.projection * Vec4::new(view_pos.x, view_pos.y, view_pos.z, 1.0);
            if let Some(hook) = &model.clip_transform {
                clip = hook(i, clip);
            }
            scratch.clip[i] = clip;

            // Behind-camera vertices collapse toward near-infinity
            // projection instead of being clipped.
            let w = clip.w.max(MIN_W);
            let mut ndc = Vec2::new(clip.x / w, clip.y / w);
            if let Some(snap) = ctx.vertex_snap {
                if snap > 0.0 {
                    let step = 1.0 / snap;
                    ndc = Vec2::new((ndc.x / step).round() * step, (ndc.y / step).round() * step);
                }
            }
            scratch.ndc[i] = ndc;
            scratch.screen[i] = Vec2::new(
                (ndc.x * 0.5 + 0.5) * px_w as f32,
                (1.0 - (ndc.y * 0.5 + 0.5)) * px_h as f32,
            );

            let depth_pos = if material.unbillboarded_depth && billboard_world.is_some() {
                scratch.world_pos[i]
            } else {
                world_pos
            };
            scratch.depths[i] = -ctx.view.transform_point3(depth_pos).z;
        }

        // Per-vertex lighting for this part's material.
        let use_lights = ctx.lighting_on && !material.shadeless;
        let baked = model
            .baked_light_channel
            .and_then(|ch| mesh.vertices.colors.get(ch));
        for i in 0..n {
            scratch.lit[i] = if !use_lights {
                Color::WHITE
            } else if let Some(channel) = baked {
                channel.get(i).copied().unwrap_or(Color::WHITE)
            } else {
                lights.accumulate(
                    model.light_group.as_ref(),
                    scratch.world_pos[i],
                    scratch.world_nrm[i],
                )
            };
        }

        // Triangle-level rejection, then depth keying.
        scratch.bucket.clear();
        for ti in triangles {
            let tri = &mesh.triangles[ti];
            let [i0, i1, i2] = tri.indices.map(|i| i as usize);

            if scratch.depths[i0] <= MIN_W
                && scratch.depths[i1] <= MIN_W
                && scratch.depths[i2] <= MIN_W
            {
                camera.stats.triangles_skipped += 1;
                continue;
            }

            let (n0, n1, n2) = (scratch.ndc[i0], scratch.ndc[i1], scratch.ndc[i2]);
            let offscreen = (n0.x < -1.0 && n1.x < -1.0 && n2.x < -1.0)
                || (n0.x > 1.0 && n1.x > 1.0 && n2.x > 1.0)
                || (n0.y < -1.0 && n1.y < -1.0 && n2.y < -1.0)
                || (n0.y > 1.0 && n1.y > 1.0 && n2.y > 1.0);
            if offscreen {
                camera.stats.triangles_skipped += 1;
                continue;
            }

            // Screen-space winding; front faces wind negative because the
            // Y axis flips on the screen mapping.
            let (s0, s1, s2) = (scratch.screen[i0], scratch.screen[i1], scratch.screen[i2]);
            let winding = (s1.x - s0.x) * (s2.y - s0.y) - (s1.y - s0.y) * (s2.x - s0.x);
            if material.backface_culling && winding >= 0.0 {
                camera.stats.triangles_skipped += 1;
                continue;
            }

            let center = (scratch.frame_pos[i0] + scratch.frame_pos[i1] + scratch.frame_pos[i2])
                / 3.0;
            scratch.bucket.push(SortEntry {
                depth: ctx.cam_pos.distance_squared(center),
                tri: ti as u32,
            });
        }

        match material.sort {
            TriangleSort::BackToFront => scratch
                .bucket
                .sort_by(|a, b| b.depth.total_cmp(&a.depth).then(a.tri.cmp(&b.tri))),
            TriangleSort::FrontToBack => scratch
                .bucket
                .sort_by(|a, b| a.depth.total_cmp(&b.depth).then(a.tri.cmp(&b.tri))),
            TriangleSort::None => {}
        }

        // Emission.
        let tint = material.color.modulate(model.color);
        let is_transparent = material.is_transparent();

        for entry in &scratch.bucket {
            let tri = &mesh.triangles[entry.tri as usize];
            let [i0, i1, i2] = tri.indices.map(|i| i as usize);
            let make_vertex = |i: usize| DrawVertex {
                position: scratch.screen[i],
                uv: mesh.vertices.uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                color: scratch.lit[i].modulate(tint),
                depth: scratch.depths[i],
            };
            let vertices = [make_vertex(i0), make_vertex(i1), make_vertex(i2)];

            let face_normal = (scratch.frame_pos[i1] - scratch.frame_pos[i0])
                .cross(scratch.frame_pos[i2] - scratch.frame_pos[i0])
                .normalize_or_zero();
            let options = DrawOptions {
                texture: material.texture.as_deref(),
                filter: material.filter,
                wrap: material.wrap,
                composite: material.composite,
                alpha_clip: material.is_alpha_clip(),
                depth_test: true,
                depth_write: !is_transparent,
                face_normal: camera.normal.is_some().then_some(face_normal),
            };

            rasterizer::draw_triangles(
                &mut camera.color,
                &mut camera.depth,
                camera.normal.as_mut(),
                &vertices,
                &[0, 1, 2],
                &options,
            );
            camera.stats.triangles_rendered += 1;
        }
    }
}

/// The camera-facing model matrix for a billboarded part, or `None` when
/// billboarding is off.
fn billboard_matrix(mode: BillboardMode, world: Mat4, ctx: &FrameContext) -> Option<Mat4> {
    if mode == BillboardMode::None {
        return None;
    }
    let (translation, _, scale) = crate::math::decompose(world);
    let rotation = match mode {
        BillboardMode::None => unreachable!(),
        BillboardMode::All => ctx.cam_rotation,
        BillboardMode::Horizontal => {
            let dir = ctx.cam_pos - translation;
            Quat::from_rotation_y(dir.x.atan2(dir.z))
        }
        BillboardMode::FixedVertical => {
            let forward = (ctx.cam_pos - translation).normalize_or_zero();
            if forward.length_squared() < f32::EPSILON
                || forward.cross(Vec3::Y).length_squared() < 1e-8
            {
                ctx.cam_rotation
            } else {
                let right = Vec3::Y.cross(forward).normalize();
                let up = forward.cross(right);
                Quat::from_mat3(&Mat3::from_cols(right, up, forward))
            }
        }
    };
    Some(Mat4::from_scale_rotation_translation(scale, rotation, translation))
}

/// Bayer 4×4 threshold matrix, normalized to (0, 1).
const BAYER: [[f32; 4]; 4] = [
    [0.5 / 16.0, 8.5 / 16.0, 2.5 / 16.0, 10.5 / 16.0],
    [12.5 / 16.0, 4.5 / 16.0, 14.5 / 16.0, 6.5 / 16.0],
    [3.5 / 16.0, 11.5 / 16.0, 1.5 / 16.0, 9.5 / 16.0],
    [15.5 / 16.0, 7.5 / 16.0, 13.5 / 16.0, 5.5 / 16.0],
];

/// Composites fog over the color target from the depth target.
fn apply_fog(camera: &mut Camera, scene: &Scene) {
    let world = &scene.world;
    if world.fog_mode == FogMode::Off {
        return;
    }
    let (w, h) = camera.size();
    let near = camera.near();
    let far = camera.far();
    let span = (far - near).max(f32::EPSILON);
    let [band_near, band_far] = world.fog_range;
    let band = (band_far - band_near).max(f32::EPSILON);
    let dither = world.dithered_fog_size.max(0.0);

    for y in 0..h {
        for x in 0..w {
            let depth = camera.depth.pixel(x, y).r;
            let normalized = ((depth - near) / span).clamp(0.0, 1.0);
            let mut factor = ((normalized - band_near) / band).clamp(0.0, 1.0);
            if dither > 0.0 {
                let cell = dither.max(1.0) as u32;
                let threshold = BAYER[((y / cell) % 4) as usize][((x / cell) % 4) as usize];
                factor = if factor >= threshold { 1.0 } else { 0.0 };
            }
            if factor <= 0.0 {
                continue;
            }

            let dst = camera.color.pixel(x, y);
            let fog = world.fog_color;
            let out = match world.fog_mode {
                FogMode::Off => dst,
                FogMode::Overwrite => dst.lerp(fog, factor),
                FogMode::Additive => dst + fog * factor,
                FogMode::Subtractive => {
                    let scaled = fog * factor;
                    Color::new(dst.r - scaled.r, dst.g - scaled.g, dst.b - scaled.b, dst.a)
                }
                FogMode::Transparent => dst * (1.0 - factor),
            };
            camera.color.set_pixel(x, y, out.clamped());
        }
    }
}

/// Runs each distinct material post shader once over the color target.
fn run_post_shaders<'a>(
    camera: &mut Camera,
    scene: &Scene,
    items: impl Iterator<Item = &'a RenderItem>,
) {
    let mut seen: Vec<usize> = Vec::new();
    let mut shaders: Vec<(ImageShader, FxHashMap<String, f32>)> = Vec::new();
    for item in items {
        let Some(model) = scene.get(item.handle).and_then(Node::model) else {
            continue;
        };
        for part in &model.mesh.parts {
            if let Some(shader) = &part.material.shader {
                let key = std::sync::Arc::as_ptr(shader).cast::<()>() as usize;
                if !seen.contains(&key) {
                    seen.push(key);
                    shaders.push((shader.clone(), part.material.shader_uniforms.clone()));
                }
            }
        }
    }
    for (shader, uniforms) in shaders {
        shader(&mut camera.color, &uniforms);
    }
}

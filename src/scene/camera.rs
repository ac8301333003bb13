use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::math::{safe_inverse, Color};
use crate::resources::image::Image;

/// Per-frame render statistics, reset at the start of each render.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub models_rendered: usize,
    pub models_culled: usize,
    pub triangles_rendered: usize,
    pub triangles_skipped: usize,
    pub lights_active: usize,
}

/// A camera component: projection parameters plus the back buffers it
/// renders into.
///
/// The view matrix is the inverse of the owning node's world transform and
/// is supplied by the renderer each frame; the camera itself only caches
/// projection state and owns the color and depth images (and an optional
/// world-normal image for debugging).
#[derive(Debug, Clone)]
pub struct Camera {
    fov_y: f32,
    near: f32,
    far: f32,
    orthographic: bool,
    ortho_scale: f32,

    width: u32,
    height: u32,
    pub(crate) color: Image,
    pub(crate) depth: Image,
    pub(crate) normal: Option<Image>,

    /// Snaps projected vertices to a grid of this many subdivisions per
    /// NDC unit, for retro pixelation. `None` disables snapping.
    pub vertex_snap: Option<f32>,
    /// Restricts rendering to the camera's sector and its neighbors.
    pub sector_rendering: bool,
    /// Neighbor depth used when `sector_rendering` is on.
    pub sector_depth: usize,

    pub stats: RenderStats,
}

impl Camera {
    /// Creates a perspective camera with a back buffer of `width`×`height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            fov_y: 60.0,
            near: 0.1,
            far: 100.0,
            orthographic: false,
            ortho_scale: 10.0,
            width,
            height,
            color: Image::new(width, height),
            depth: Image::new(width, height),
            normal: None,
            vertex_snap: None,
            sector_rendering: false,
            sector_depth: 1,
            stats: RenderStats::default(),
        }
    }

    /// Vertical field of view in degrees.
    #[must_use]
    pub fn fov(&self) -> f32 {
        self.fov_y
    }

    pub fn set_fov(&mut self, fov_y: f32) {
        self.fov_y = fov_y.clamp(1.0, 179.0);
    }

    pub fn set_perspective(&mut self, fov_y: f32, near: f32, far: f32) {
        self.set_fov(fov_y);
        self.near = near.max(1e-4);
        self.far = far.max(self.near + 1e-4);
        self.orthographic = false;
    }

    /// Switches to an orthographic projection; `scale` is half the vertical
    /// extent in world units.
    pub fn set_orthographic(&mut self, scale: f32, near: f32, far: f32) {
        self.ortho_scale = scale.max(1e-4);
        self.near = near;
        self.far = far.max(near + 1e-4);
        self.orthographic = true;
    }

    #[must_use]
    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Back-buffer size in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes the back buffers, dropping their contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.width = width;
        self.height = height;
        self.color = Image::new(width, height);
        self.depth = Image::new(width, height);
        if self.normal.is_some() {
            self.normal = Some(Image::new(width, height));
        }
    }

    /// Enables or disables the world-normal debug target.
    pub fn set_normal_target(&mut self, enabled: bool) {
        if enabled && self.normal.is_none() {
            self.normal = Some(Image::new(self.width, self.height));
        } else if !enabled {
            self.normal = None;
        }
    }

    /// The rendered color image.
    #[must_use]
    pub fn color_texture(&self) -> &Image {
        &self.color
    }

    /// The rendered depth image; view-space distance is stored in the red
    /// channel.
    #[must_use]
    pub fn depth_texture(&self) -> &Image {
        &self.depth
    }

    #[must_use]
    pub fn normal_texture(&self) -> Option<&Image> {
        self.normal.as_ref()
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// The projection matrix for the current parameters.
    ///
    /// Perspective projections look down -Z with a vertical FoV in degrees;
    /// orthographic projections span `±ortho_scale` vertically.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        if self.orthographic {
            let h = self.ortho_scale;
            let w = h * self.aspect();
            Mat4::orthographic_rh_gl(-w, w, -h, h, self.near, self.far)
        } else {
            Mat4::perspective_rh_gl(self.fov_y.to_radians(), self.aspect(), self.near, self.far)
        }
    }

    /// Clears color to `clear_color` and depth to the far distance.
    pub(crate) fn clear(&mut self, clear_color: Color) {
        self.color.fill(clear_color);
        self.depth.fill(Color::new(self.far, 0.0, 0.0, 1.0));
        if let Some(normal) = &mut self.normal {
            normal.fill(Color::new(0.5, 0.5, 1.0, 1.0));
        }
        self.stats = RenderStats::default();
    }

    /// Projects a world-space point to pixel coordinates plus view depth.
    ///
    /// Returns `None` when the point is behind the near plane.
    #[must_use]
    pub fn world_to_screen(&self, point: Vec3, camera_world: Mat4) -> Option<Vec3> {
        let view = safe_inverse(camera_world);
        let view_point = view.transform_point3(point);
        let view_depth = -view_point.z;
        let clip = self.projection() * Vec4::new(view_point.x, view_point.y, view_point.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        Some(Vec3::new(
            (ndc.x * 0.5 + 0.5) * self.width as f32,
            (1.0 - (ndc.y * 0.5 + 0.5)) * self.height as f32,
            view_depth,
        ))
    }

    /// Unprojects pixel coordinates at the given view depth back to world
    /// space. Inverse of [`world_to_screen`](Self::world_to_screen).
    #[must_use]
    pub fn screen_to_world(&self, x: f32, y: f32, depth: f32, camera_world: Mat4) -> Vec3 {
        let ndc = Vec2::new(
            x / self.width as f32 * 2.0 - 1.0,
            (1.0 - y / self.height as f32) * 2.0 - 1.0,
        );
        let view_point = if self.orthographic {
            let h = self.ortho_scale;
            Vec3::new(ndc.x * h * self.aspect(), ndc.y * h, -depth)
        } else {
            let half_h = (self.fov_y.to_radians() * 0.5).tan();
            Vec3::new(
                ndc.x * half_h * self.aspect() * depth,
                ndc.y * half_h * depth,
                -depth,
            )
        };
        camera_world.transform_point3(view_point)
    }
}

/// View frustum as six inward-facing planes extracted from a
/// view-projection matrix (Gribb-Hartmann).
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        let mut planes = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] + rows[2], // near
            rows[3] - rows[2], // far
        ];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// True when the sphere is fully or partially inside the frustum.
    #[must_use]
    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        let p = Vec4::new(center.x, center.y, center.z, 1.0);
        self.planes.iter().all(|plane| plane.dot(p) >= -radius)
    }
}

use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use crate::math::Color;
use crate::resources::mesh::Mesh;
use crate::scene::light::LightGroup;
use crate::scene::NodeHandle;

/// Per-vertex CPU hook run after skinning, on the world-space position.
pub type VertexTransformHook = Arc<dyn Fn(usize, Vec3) -> Vec3 + Send + Sync>;

/// Per-vertex CPU hook run on the clip-space result of the view-projection.
pub type ClipTransformHook = Arc<dyn Fn(usize, Vec4) -> Vec4 + Send + Sync>;

/// Skeleton binding for a skinned model.
///
/// `joints[i]` pairs with `inverse_binds[i]`; mesh vertices reference joints
/// by index through their `[u16; 4]` joint attribute.
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub root: Option<NodeHandle>,
    pub joints: Vec<NodeHandle>,
    pub inverse_binds: Vec<Mat4>,
}

/// A mesh instance in the scene.
///
/// Shares its [`Mesh`] by reference unless the mesh is marked `unique`, in
/// which case cloning the model deep-copies the mesh. The tint color
/// multiplies every mesh-part material color at render time.
#[derive(Clone)]
pub struct Model {
    pub mesh: Arc<Mesh>,
    /// Tint multiplied into every rendered vertex color.
    pub color: Color,
    /// Radius of the frustum-culling sphere; derived from the mesh bounds
    /// when `None`.
    pub cull_radius: Option<f32>,
    /// Restricts which lights illuminate this model.
    pub light_group: Option<LightGroup>,
    /// Reads baked light from this vertex color channel instead of running
    /// dynamic lights.
    pub baked_light_channel: Option<usize>,
    pub skin: Option<Skin>,
    pub vertex_transform: Option<VertexTransformHook>,
    pub clip_transform: Option<ClipTransformHook>,

    /// Models folded into this model's draw by dynamic batching.
    pub(crate) batch_members: Vec<NodeHandle>,
    /// Mesh part whose material renders the batched members.
    pub(crate) batch_part: usize,
    /// Set on members while they belong to a batch owner.
    pub(crate) batch_owner: Option<NodeHandle>,
}

impl Model {
    #[must_use]
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            color: Color::WHITE,
            cull_radius: None,
            light_group: None,
            baked_light_channel: None,
            skin: None,
            vertex_transform: None,
            clip_transform: None,
            batch_members: Vec::new(),
            batch_part: 0,
            batch_owner: None,
        }
    }

    /// Radius of the culling sphere in local space.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        self.cull_radius
            .unwrap_or_else(|| self.mesh.dimensions.size().length() * 0.5)
    }

    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.skin.is_some() && self.mesh.vertices.has_skin_data()
    }

    /// Handles of the models batched into this one.
    #[must_use]
    pub fn batch_members(&self) -> &[NodeHandle] {
        &self.batch_members
    }

    /// The batch owner, when this model is rendered as part of a batch.
    #[must_use]
    pub fn batch_owner(&self) -> Option<NodeHandle> {
        self.batch_owner
    }
}

impl crate::scene::Scene {
    /// Folds `members` into `owner`'s draw call: their geometry renders
    /// through the material of `owner`'s mesh part `part`, transformed by
    /// their own world matrices.
    ///
    /// Fails with [`KilnError::BatchCapacity`] when the combined triangle
    /// count would exceed the per-draw maximum; the batch is left
    /// unchanged.
    ///
    /// [`KilnError::BatchCapacity`]: crate::errors::KilnError::BatchCapacity
    pub fn dynamic_batch_add(
        &mut self,
        owner: NodeHandle,
        part: usize,
        members: &[NodeHandle],
    ) -> crate::errors::Result<()> {
        let mut triangles = {
            let Some(model) = self.get(owner).and_then(crate::scene::Node::model) else {
                return Ok(());
            };
            let mut count = model.mesh.triangle_count();
            for &member in &model.batch_members {
                if let Some(m) = self.get(member).and_then(crate::scene::Node::model) {
                    count += m.mesh.triangle_count();
                }
            }
            count
        };
        for &member in members {
            if let Some(m) = self.get(member).and_then(crate::scene::Node::model) {
                triangles += m.mesh.triangle_count();
            }
        }
        if triangles > crate::errors::MAX_BATCH_TRIANGLES {
            return Err(crate::errors::KilnError::BatchCapacity { triangles });
        }

        for &member in members {
            if member == owner {
                continue;
            }
            let valid = self
                .get(member)
                .and_then(crate::scene::Node::model)
                .is_some();
            if !valid {
                continue;
            }
            if let Some(m) = self.get_mut(member).and_then(crate::scene::Node::model_mut) {
                m.batch_owner = Some(owner);
            }
            if let Some(o) = self.get_mut(owner).and_then(crate::scene::Node::model_mut) {
                if !o.batch_members.contains(&member) {
                    o.batch_members.push(member);
                }
                o.batch_part = part;
            }
        }
        Ok(())
    }

    /// Releases `members` from `owner`'s dynamic batch.
    pub fn dynamic_batch_remove(&mut self, owner: NodeHandle, members: &[NodeHandle]) {
        for &member in members {
            if let Some(m) = self.get_mut(member).and_then(crate::scene::Node::model_mut) {
                if m.batch_owner == Some(owner) {
                    m.batch_owner = None;
                }
            }
            if let Some(o) = self.get_mut(owner).and_then(crate::scene::Node::model_mut) {
                o.batch_members.retain(|&h| h != member);
            }
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("mesh", &self.mesh.name)
            .field("color", &self.color)
            .field("skin", &self.skin)
            .field("vertex_transform", &self.vertex_transform.is_some())
            .field("clip_transform", &self.clip_transform.is_some())
            .field("batch_members", &self.batch_members.len())
            .finish_non_exhaustive()
    }
}

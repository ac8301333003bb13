use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::Animation;
use crate::resources::material::Material;
use crate::resources::mesh::Mesh;
use crate::resources::world::World;
use crate::scene::Scene;

/// A bundle of loaded resources, produced by the importer.
///
/// Every resource is reachable both by name and by the stable id assigned
/// at insertion. Names are not required to be unique in source files; on
/// collision the later resource shadows the earlier one by name while both
/// stay reachable by id.
#[derive(Default)]
pub struct Library {
    pub scenes: Vec<Scene>,
    /// Index into `scenes` of the exporter's default scene.
    pub default_scene: Option<usize>,

    meshes: FxHashMap<String, Arc<Mesh>>,
    animations: FxHashMap<String, Arc<Animation>>,
    materials: FxHashMap<String, Material>,
    worlds: FxHashMap<String, World>,

    mesh_ids: FxHashMap<u32, Arc<Mesh>>,
    animation_ids: FxHashMap<u32, Arc<Animation>>,
    next_id: u32,
}

impl Library {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Registers a mesh, assigning its stable id, and returns the shared
    /// handle.
    pub fn add_mesh(&mut self, mut mesh: Mesh) -> Arc<Mesh> {
        mesh.id = self.alloc_id();
        let shared = Arc::new(mesh);
        self.meshes.insert(shared.name.clone(), shared.clone());
        self.mesh_ids.insert(shared.id, shared.clone());
        shared
    }

    pub fn add_animation(&mut self, mut animation: Animation) -> Arc<Animation> {
        animation.id = self.alloc_id();
        let shared = Arc::new(animation);
        self.animations.insert(shared.name.clone(), shared.clone());
        self.animation_ids.insert(shared.id, shared.clone());
        shared
    }

    pub fn add_material(&mut self, mut material: Material) {
        material.id = self.alloc_id();
        self.materials.insert(material.name.clone(), material);
    }

    pub fn add_world(&mut self, mut world: World) {
        world.id = self.alloc_id();
        self.worlds.insert(world.name.clone(), world);
    }

    #[must_use]
    pub fn scene_by_name(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn scene_by_id(&self, id: u32) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_by_name_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.name == name)
    }

    /// The exporter's default scene, or the first one loaded.
    #[must_use]
    pub fn default_scene(&self) -> Option<&Scene> {
        self.default_scene
            .and_then(|i| self.scenes.get(i))
            .or_else(|| self.scenes.first())
    }

    #[must_use]
    pub fn mesh_by_name(&self, name: &str) -> Option<&Arc<Mesh>> {
        self.meshes.get(name)
    }

    #[must_use]
    pub fn mesh_by_id(&self, id: u32) -> Option<&Arc<Mesh>> {
        self.mesh_ids.get(&id)
    }

    #[must_use]
    pub fn animation_by_name(&self, name: &str) -> Option<&Arc<Animation>> {
        self.animations.get(name)
    }

    #[must_use]
    pub fn animation_by_id(&self, id: u32) -> Option<&Arc<Animation>> {
        self.animation_ids.get(&id)
    }

    #[must_use]
    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    #[must_use]
    pub fn material_by_id(&self, id: u32) -> Option<&Material> {
        self.materials.values().find(|m| m.id == id)
    }

    #[must_use]
    pub fn world_by_name(&self, name: &str) -> Option<&World> {
        self.worlds.get(name)
    }

    #[must_use]
    pub fn world_by_id(&self, id: u32) -> Option<&World> {
        self.worlds.values().find(|w| w.id == id)
    }

    pub fn mesh_names(&self) -> impl Iterator<Item = &str> {
        self.meshes.keys().map(String::as_str)
    }

    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }
}

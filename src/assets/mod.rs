//! Asset import.
//!
//! glTF 2.0 (.gltf / .glb) is the supported interchange path; the importer
//! fills a [`Library`](crate::resources::Library) with scenes, meshes,
//! materials, animations and worlds, and copies glTF `extras` into node
//! property maps. Collada (.dae) was a legacy fallback in older engines of
//! this family and is intentionally not carried.

mod gltf;

pub use gltf::{load_gltf, load_gltf_bytes};

//! Resource types: meshes, materials, images, worlds and the library that
//! bundles them.
//!
//! Meshes are shared between models with `Arc`; everything here is plain
//! data read by the renderer and the collision system.

pub mod image;
pub mod library;
pub mod material;
pub mod mesh;
pub mod primitives;
pub mod world;

pub use image::Image;
pub use library::Library;
pub use material::{
    BillboardMode, Composite, ImageShader, Material, TextureFilter, TextureWrap, Transparency,
    TriangleSort,
};
pub use mesh::{Mesh, MeshPart, Triangle, VertexAttributes, VertexData};
pub use world::{FogMode, World};

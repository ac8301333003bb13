use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};
use log::warn;

use crate::animation::{Animation, AnimationTrack, Interpolation};
use crate::errors::Result;
use crate::math::Color;
use crate::resources::image::Image;
use crate::resources::library::Library;
use crate::resources::material::{Material, TextureFilter, TextureWrap, Transparency};
use crate::resources::mesh::{Mesh, VertexAttributes, MAX_BONE_INFLUENCES};
use crate::resources::world::{FogMode, World};
use crate::scene::{Camera, Light, Model, Node, NodeHandle, NodeKind, Property, Scene, Skin};

/// Imports a glTF or GLB file into a [`Library`].
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Library> {
    let (document, buffers, images) = gltf::import(path)?;
    import_document(&document, &buffers, &images)
}

/// Imports glTF or GLB data from memory.
pub fn load_gltf_bytes(bytes: &[u8]) -> Result<Library> {
    let (document, buffers, images) = gltf::import_slice(bytes)?;
    import_document(&document, &buffers, &images)
}

fn import_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<Library> {
    let mut library = Library::new();

    let textures = import_textures(document, images);
    let materials = import_materials(document, &textures, &mut library);
    let meshes = import_meshes(document, buffers, &materials, &mut library);

    for gltf_scene in document.scenes() {
        let scene = import_scene(&gltf_scene, document, buffers, &meshes, &mut library);
        library.scenes.push(scene);
    }
    library.default_scene = document.default_scene().map(|s| s.index());

    for animation in document.animations() {
        let imported = import_animation(&animation, buffers);
        library.add_animation(imported);
    }

    Ok(library)
}

// ============================================================================
// Textures & materials
// ============================================================================

fn import_textures(document: &gltf::Document, images: &[gltf::image::Data]) -> Vec<Arc<Image>> {
    document
        .textures()
        .map(|texture| {
            let index = texture.source().index();
            let Some(data) = images.get(index) else {
                warn!("texture {} references missing image {index}", texture.index());
                return Arc::new(Image::new(1, 1));
            };
            Arc::new(decode_image(data))
        })
        .collect()
}

fn decode_image(data: &gltf::image::Data) -> Image {
    use gltf::image::Format;
    let pixel_count = (data.width * data.height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    match data.format {
        Format::R8G8B8A8 => rgba.extend_from_slice(&data.pixels),
        Format::R8G8B8 => {
            for p in data.pixels.chunks_exact(3) {
                rgba.extend_from_slice(&[p[0], p[1], p[2], 255]);
            }
        }
        Format::R8G8 => {
            for p in data.pixels.chunks_exact(2) {
                rgba.extend_from_slice(&[p[0], p[0], p[0], p[1]]);
            }
        }
        Format::R8 => {
            for &p in &data.pixels {
                rgba.extend_from_slice(&[p, p, p, 255]);
            }
        }
        other => {
            warn!("unsupported texture format {other:?}; substituting white");
            rgba.resize(pixel_count * 4, 255);
        }
    }
    if rgba.len() != pixel_count * 4 {
        rgba.resize(pixel_count * 4, 255);
    }
    Image::from_rgba8(data.width, data.height, &rgba)
}

fn import_materials(
    document: &gltf::Document,
    textures: &[Arc<Image>],
    library: &mut Library,
) -> Vec<Material> {
    let mut materials = Vec::new();
    for (index, source) in document.materials().enumerate() {
        let name = source
            .name()
            .map_or_else(|| format!("material{index}"), str::to_string);
        let mut material = Material::new(name);

        let pbr = source.pbr_metallic_roughness();
        let base = pbr.base_color_factor();
        material.color = Color::new(base[0], base[1], base[2], base[3]);

        if let Some(info) = pbr.base_color_texture() {
            let texture = info.texture();
            if let Some(image) = textures.get(texture.index()) {
                material.texture = Some(image.clone());
            }
            let sampler = texture.sampler();
            material.filter = match sampler.mag_filter() {
                Some(gltf::texture::MagFilter::Linear) => TextureFilter::Linear,
                _ => TextureFilter::Nearest,
            };
            material.wrap = match sampler.wrap_s() {
                gltf::texture::WrappingMode::ClampToEdge => TextureWrap::Clamp,
                _ => TextureWrap::Repeat,
            };
        }

        material.transparency = match source.alpha_mode() {
            gltf::material::AlphaMode::Opaque => Transparency::Opaque,
            gltf::material::AlphaMode::Mask => Transparency::AlphaClip,
            gltf::material::AlphaMode::Blend => Transparency::Transparent,
        };
        material.backface_culling = !source.double_sided();
        material.shadeless = source.unlit();

        library.add_material(material.clone());
        materials.push(material);
    }
    materials
}

// ============================================================================
// Meshes
// ============================================================================

fn import_meshes(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    materials: &[Material],
    library: &mut Library,
) -> Vec<Arc<Mesh>> {
    let mut meshes = Vec::new();
    for (index, source) in document.meshes().enumerate() {
        let name = source
            .name()
            .map_or_else(|| format!("mesh{index}"), str::to_string);
        let mut mesh = Mesh::new(name);
        let mut missing_normals = false;
        let mut any_colors = false;

        for primitive in source.primitives() {
            let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                warn!("mesh {index}: primitive without positions skipped");
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
            let count = positions.len();

            let normals: Option<Vec<Vec3>> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from_array).collect());
            if normals.is_none() {
                missing_normals = true;
            }
            let uvs: Option<Vec<Vec2>> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().map(Vec2::from_array).collect());

            let base = mesh.add_vertices(
                &positions,
                normals.as_deref(),
                uvs.as_deref(),
            );

            // Per-vertex colors land in channel zero.
            if let Some(colors) = reader.read_colors(0) {
                if mesh.vertices.colors.is_empty() {
                    mesh.vertices.colors.push(vec![
                        Color::WHITE;
                        base as usize
                    ]);
                }
                let channel = &mut mesh.vertices.colors[0];
                channel.extend(
                    colors
                        .into_rgba_f32()
                        .map(|c| Color::new(c[0], c[1], c[2], c[3])),
                );
                any_colors = true;
            } else if !mesh.vertices.colors.is_empty() {
                let channel = &mut mesh.vertices.colors[0];
                channel.resize(base as usize + count, Color::WHITE);
            }

            // Skinning attributes stay aligned with positions across
            // primitives; unskinned primitives pad with zero weights.
            let joints: Option<Vec<[u16; MAX_BONE_INFLUENCES]>> =
                reader.read_joints(0).map(|j| j.into_u16().collect());
            let weights: Option<Vec<[f32; MAX_BONE_INFLUENCES]>> =
                reader.read_weights(0).map(|w| w.into_f32().collect());
            if let (Some(joints), Some(weights)) = (joints, weights) {
                mesh.vertices
                    .joints
                    .resize(base as usize, [0; MAX_BONE_INFLUENCES]);
                mesh.vertices
                    .weights
                    .resize(base as usize, [0.0; MAX_BONE_INFLUENCES]);
                mesh.vertices.joints.extend(joints);
                mesh.vertices.weights.extend(weights);
            } else if !mesh.vertices.joints.is_empty() {
                mesh.vertices
                    .joints
                    .resize(base as usize + count, [0; MAX_BONE_INFLUENCES]);
                mesh.vertices
                    .weights
                    .resize(base as usize + count, [0.0; MAX_BONE_INFLUENCES]);
            }

            let indices: Vec<u32> = reader
                .read_indices()
                .map_or_else(|| (0..count as u32).collect(), |i| i.into_u32().collect());
            let offset: Vec<u32> = indices.iter().map(|i| i + base).collect();

            let material = primitive
                .material()
                .index()
                .and_then(|i| materials.get(i).cloned())
                .unwrap_or_default();
            mesh.add_part(material, &offset);
        }

        if any_colors {
            let count = mesh.vertex_count();
            mesh.vertices.colors[0].resize(count, Color::WHITE);
            mesh.attributes |= VertexAttributes::COLORS;
        }
        if mesh.vertices.has_skin_data() {
            mesh.attributes |= VertexAttributes::JOINTS | VertexAttributes::WEIGHTS;
        }
        if missing_normals {
            mesh.recalculate_normals();
        }
        meshes.push(library.add_mesh(mesh));
    }
    meshes
}

// ============================================================================
// Scenes & nodes
// ============================================================================

fn node_name(node: &gltf::Node<'_>) -> String {
    node.name()
        .map_or_else(|| format!("node{}", node.index()), str::to_string)
}

fn import_scene(
    gltf_scene: &gltf::Scene<'_>,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    meshes: &[Arc<Mesh>],
    library: &mut Library,
) -> Scene {
    let scene_name = gltf_scene
        .name()
        .map_or_else(|| format!("scene{}", gltf_scene.index()), str::to_string);
    let mut scene = Scene::new(scene_name.clone());

    let mut handles: Vec<Option<NodeHandle>> = vec![None; document.nodes().len()];
    for root in gltf_scene.nodes() {
        import_node(&root, None, &mut scene, meshes, &mut handles);
    }

    // Skins can only bind once every node handle exists.
    for source in gltf_scene.nodes() {
        bind_skins(&source, buffers, &mut scene, &handles);
    }

    // World settings from scene extras, with defaults otherwise.
    let mut world = World::new(scene_name);
    if let Some(extras) = parse_extras(gltf_scene.extras()) {
        apply_world_extras(&mut world, &extras);
    }
    scene.world = world.clone();
    library.add_world(world);

    scene
}

fn import_node(
    source: &gltf::Node<'_>,
    parent: Option<NodeHandle>,
    scene: &mut Scene,
    meshes: &[Arc<Mesh>],
    handles: &mut Vec<Option<NodeHandle>>,
) {
    let kind = node_kind(source, meshes);
    let mut node = Node::new(node_name(source), kind);

    let (translation, rotation, scale) = source.transform().decomposed();
    node.transform.position = Vec3::from_array(translation);
    node.transform.rotation =
        Quat::from_xyzw(rotation[0], rotation[1], rotation[2], rotation[3]).normalize();
    node.transform.scale = Vec3::from_array(scale);

    if let Some(extras) = parse_extras(source.extras()) {
        for (key, value) in extras {
            node.properties.set(key, value);
        }
    }

    let handle = match parent {
        Some(p) => scene.insert_child(p, node),
        None => scene.add_node(node),
    };
    handles[source.index()] = Some(handle);

    for child in source.children() {
        import_node(&child, Some(handle), scene, meshes, handles);
    }
}

fn node_kind(source: &gltf::Node<'_>, meshes: &[Arc<Mesh>]) -> NodeKind {
    if let Some(mesh) = source.mesh() {
        if let Some(shared) = meshes.get(mesh.index()) {
            return NodeKind::Model(Box::new(Model::new(shared.clone())));
        }
    }
    if let Some(camera) = source.camera() {
        let mut component = Camera::new(640, 360);
        match camera.projection() {
            gltf::camera::Projection::Perspective(p) => {
                component.set_perspective(
                    p.yfov().to_degrees(),
                    p.znear(),
                    p.zfar().unwrap_or(100.0),
                );
            }
            gltf::camera::Projection::Orthographic(o) => {
                component.set_orthographic(o.ymag(), o.znear(), o.zfar());
            }
        }
        return NodeKind::Camera(Box::new(component));
    }
    if let Some(light) = source.light() {
        let color = Color::rgb(light.color()[0], light.color()[1], light.color()[2]);
        let energy = light.intensity();
        let component = match light.kind() {
            gltf::khr_lights_punctual::Kind::Directional => {
                Light::new_directional(color, energy)
            }
            gltf::khr_lights_punctual::Kind::Point => {
                Light::new_point(color, energy, light.range().unwrap_or(10.0))
            }
            gltf::khr_lights_punctual::Kind::Spot { .. } => {
                // No spot variant in the lighting model; a point light of
                // the same range is the closest fit.
                warn!("spot light '{}' imported as point", node_name(source));
                Light::new_point(color, energy, light.range().unwrap_or(10.0))
            }
        };
        return NodeKind::Light(component);
    }
    NodeKind::Empty
}

fn bind_skins(
    source: &gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
    scene: &mut Scene,
    handles: &[Option<NodeHandle>],
) {
    if let (Some(skin), Some(Some(handle))) = (source.skin(), handles.get(source.index())) {
        let reader = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let inverse_binds: Vec<Mat4> = reader
            .read_inverse_bind_matrices()
            .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
            .unwrap_or_default();
        let joints: Vec<NodeHandle> = skin
            .joints()
            .filter_map(|j| handles.get(j.index()).copied().flatten())
            .collect();
        let root = skin
            .skeleton()
            .and_then(|s| handles.get(s.index()).copied().flatten());

        if let Some(model) = scene.get_mut(*handle).and_then(Node::model_mut) {
            model.skin = Some(Skin {
                root,
                joints,
                inverse_binds,
            });
        }
    }
    for child in source.children() {
        bind_skins(&child, buffers, scene, handles);
    }
}

// ============================================================================
// Animations
// ============================================================================

fn import_animation(source: &gltf::Animation<'_>, buffers: &[gltf::buffer::Data]) -> Animation {
    let name = source
        .name()
        .map_or_else(|| format!("animation{}", source.index()), str::to_string);
    let mut animation = Animation::new(name);

    for channel in source.channels() {
        let target_name = node_name(&channel.target().node());
        let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let Some(times) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = times.collect();
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Constant,
            gltf::animation::Interpolation::CubicSpline => Interpolation::Cubic,
        };
        // Cubic samplers store in-tangent / value / out-tangent triples;
        // only the values are kept since sampling is linear anyway.
        let stride = if interpolation == Interpolation::Cubic { 3 } else { 1 };
        let pick = |i: usize| i * stride + (stride / 2);

        let Some(outputs) = reader.read_outputs() else {
            continue;
        };
        match outputs {
            gltf::animation::util::ReadOutputs::Translations(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from_array).collect();
                let track = AnimationTrack::from_keyframes(
                    times
                        .iter()
                        .enumerate()
                        .filter_map(|(i, &t)| values.get(pick(i)).map(|v| (t, *v))),
                    interpolation,
                );
                animation.channel(target_name).position = Some(track);
            }
            gltf::animation::util::ReadOutputs::Scales(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from_array).collect();
                let track = AnimationTrack::from_keyframes(
                    times
                        .iter()
                        .enumerate()
                        .filter_map(|(i, &t)| values.get(pick(i)).map(|v| (t, *v))),
                    interpolation,
                );
                animation.channel(target_name).scale = Some(track);
            }
            gltf::animation::util::ReadOutputs::Rotations(rotations) => {
                let values: Vec<Quat> = rotations
                    .into_f32()
                    .map(|q| Quat::from_xyzw(q[0], q[1], q[2], q[3]).normalize())
                    .collect();
                let track = AnimationTrack::from_keyframes(
                    times
                        .iter()
                        .enumerate()
                        .filter_map(|(i, &t)| values.get(pick(i)).map(|v| (t, *v))),
                    interpolation,
                );
                animation.channel(target_name).rotation = Some(track);
            }
            gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {}
        }
    }

    if let Some(extras) = parse_extras(source.extras()) {
        apply_markers(&mut animation, &extras);
    }
    animation.recalculate_length();
    animation
}

// ============================================================================
// Extras
// ============================================================================

/// Converts a glTF extras blob into property pairs. Nested objects and
/// unsupported shapes are dropped.
fn parse_extras(extras: &gltf::json::Extras) -> Option<Vec<(String, Property)>> {
    let raw = extras.as_ref()?;
    let value: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    let object = value.as_object()?;

    let mut properties = Vec::new();
    for (key, value) in object {
        if let Some(property) = json_to_property(value) {
            properties.push((key.clone(), property));
        }
    }
    Some(properties)
}

fn json_to_property(value: &serde_json::Value) -> Option<Property> {
    match value {
        serde_json::Value::Bool(b) => Some(Property::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Property::Int(i))
            } else {
                n.as_f64().map(|f| Property::Float(f as f32))
            }
        }
        serde_json::Value::String(s) => Some(Property::String(s.clone())),
        serde_json::Value::Array(items) => {
            let floats: Vec<f32> = items
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            if floats.len() != items.len() {
                return None;
            }
            match floats.len() {
                2 => Some(Property::Vec2(Vec2::new(floats[0], floats[1]))),
                3 => Some(Property::Vec3(Vec3::new(floats[0], floats[1], floats[2]))),
                4 => Some(Property::Color(Color::new(
                    floats[0], floats[1], floats[2], floats[3],
                ))),
                _ => None,
            }
        }
        _ => None,
    }
}

fn apply_world_extras(world: &mut World, extras: &[(String, Property)]) {
    for (key, value) in extras {
        match (key.as_str(), value) {
            ("clear_color", Property::Color(c)) => world.clear_color = *c,
            ("fog_color", Property::Color(c)) => world.fog_color = *c,
            ("fog_mode", Property::String(s)) => {
                world.fog_mode = match s.as_str() {
                    "overwrite" => FogMode::Overwrite,
                    "additive" => FogMode::Additive,
                    "subtractive" => FogMode::Subtractive,
                    "transparent" => FogMode::Transparent,
                    _ => FogMode::Off,
                };
            }
            ("fog_range", Property::Vec2(v)) => world.set_fog_range(v.x, v.y),
            ("dithered_fog_size", Property::Float(f)) => world.dithered_fog_size = *f,
            ("lighting", Property::Bool(b)) => world.lighting = *b,
            ("ambient_color", Property::Color(c)) => world.ambient_color = *c,
            ("ambient_energy", Property::Float(f)) => world.ambient_energy = *f,
            _ => {}
        }
    }
}

/// Markers arrive as extras of the form `"marker:<name>": <time>`.
fn apply_markers(animation: &mut Animation, extras: &[(String, Property)]) {
    for (key, value) in extras {
        if let Some(name) = key.strip_prefix("marker:") {
            if let Some(time) = value.as_float() {
                animation.add_marker(time, name);
            }
        }
    }
}

//! Scene graph structure tests
//!
//! Covers:
//! - Node identity and lookup
//! - Tree search with chained filters
//! - Subtree cloning: id reassignment, payload remapping, hook ordering,
//!   mesh sharing vs deep copy
//! - Properties round trips
//! - Grid connections and pathfinding, sector neighbors, path sampling

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use kiln::collision::Bounding;
use kiln::math::{Color, Dimensions};
use kiln::resources::primitives;
use kiln::scene::{
    Grid, GridPoint, Model, Node, NodeKind, Path, Scene, Sector, SectorDetection,
};

#[test]
fn node_ids_are_unique_and_stable() {
    let mut scene = Scene::new("test");
    let a = scene.add_node(Node::empty("a"));
    let b = scene.add_node(Node::empty("b"));
    let id_a = scene.get(a).unwrap().id();
    let id_b = scene.get(b).unwrap().id();
    assert_ne!(id_a, id_b);
    assert_eq!(scene.node_by_id(id_a), Some(a));
    assert_eq!(scene.node_by_id(id_b), Some(b));
}

#[test]
fn remove_drops_whole_subtree() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    let child = scene.insert_child(root, Node::empty("child"));
    let leaf = scene.insert_child(child, Node::empty("leaf"));

    scene.remove(child);
    assert!(scene.get(child).is_none());
    assert!(scene.get(leaf).is_none());
    assert!(scene.get(root).unwrap().children().is_empty());
}

#[test]
fn search_filters_chain() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    let enemy_a = scene.insert_child(root, Node::empty("enemy_grunt"));
    let enemy_b = scene.insert_child(root, Node::empty("enemy_boss"));
    let _prop = scene.insert_child(root, Node::empty("barrel"));
    let nested = scene.insert_child(enemy_a, Node::empty("enemy_backup"));

    scene
        .get_mut(enemy_b)
        .unwrap()
        .properties
        .set("hp", 100_i64);

    let enemies: Vec<_> = scene.search(root).by_prefix("enemy").collect();
    assert_eq!(enemies.len(), 3);
    assert!(enemies.contains(&nested));

    let with_hp: Vec<_> = scene
        .search(root)
        .by_prefix("enemy")
        .by_property("hp")
        .collect();
    assert_eq!(with_hp, vec![enemy_b]);

    assert_eq!(scene.search(root).by_name("barrel").count(), 1);
}

#[test]
fn search_by_kind_finds_payloads() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    let mesh = Arc::new(primitives::cube(1.0, 1.0, 1.0));
    scene.insert_child(root, Node::new("box", NodeKind::Model(Box::new(Model::new(mesh)))));
    scene.insert_child(
        root,
        Node::new("hitbox", NodeKind::Bounding(Bounding::sphere(1.0))),
    );

    assert_eq!(scene.search(root).models().count(), 1);
    assert_eq!(scene.search(root).bounding_objects().count(), 1);
    assert_eq!(scene.search(root).lights().count(), 0);
}

#[test]
fn clone_reassigns_ids_and_copies_properties() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    let child = scene.insert_child(root, Node::empty("child"));
    scene.get_mut(child).unwrap().properties.set("key", "value");
    scene.set_local_position(child, Vec3::new(1.0, 2.0, 3.0));

    let cloned_root = scene.clone_subtree(root).unwrap();
    assert_ne!(cloned_root, root);
    assert_ne!(
        scene.get(cloned_root).unwrap().id(),
        scene.get(root).unwrap().id()
    );

    let cloned_child = scene.get(cloned_root).unwrap().children()[0];
    let node = scene.get(cloned_child).unwrap();
    assert_eq!(node.name, "child");
    assert_eq!(
        node.properties.get("key").and_then(|p| p.as_str()),
        Some("value")
    );
    assert_eq!(scene.world_position(cloned_child), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn clone_hooks_fire_after_edges_are_wired() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    scene.insert_child(root, Node::empty("child"));

    // The hook sees the clone's children already attached.
    let seen_children = Arc::new(AtomicUsize::new(0));
    let captured = seen_children.clone();
    scene.get_mut(root).unwrap().hooks.on_clone = Some(Arc::new(move |node: &mut Node| {
        captured.store(node.children().len(), Ordering::SeqCst);
    }));

    let clone_count = Arc::new(AtomicUsize::new(0));
    {
        let captured = clone_count.clone();
        let hook: kiln::scene::NodeCallback = Arc::new(move |_: &mut Node| {
            captured.fetch_add(1, Ordering::SeqCst);
        });
        for handle in scene.search(root).collect::<Vec<_>>() {
            scene.get_mut(handle).unwrap().hooks.on_clone = Some(hook.clone());
        }
    }

    scene.clone_subtree(root).unwrap();
    assert_eq!(seen_children.load(Ordering::SeqCst), 1);
    assert_eq!(clone_count.load(Ordering::SeqCst), 1);
}

#[test]
fn clone_shares_meshes_unless_unique() {
    let mut scene = Scene::new("test");
    let shared_mesh = Arc::new(primitives::cube(1.0, 1.0, 1.0));
    let shared = scene.add_node(Node::new(
        "shared",
        NodeKind::Model(Box::new(Model::new(shared_mesh.clone()))),
    ));

    let mut unique_mesh = primitives::cube(1.0, 1.0, 1.0);
    unique_mesh.unique = true;
    let unique = scene.add_node(Node::new(
        "unique",
        NodeKind::Model(Box::new(Model::new(Arc::new(unique_mesh)))),
    ));

    let shared_clone = scene.clone_subtree(shared).unwrap();
    let unique_clone = scene.clone_subtree(unique).unwrap();

    let shared_ptr = scene.get(shared_clone).unwrap().model().unwrap().mesh.clone();
    assert!(Arc::ptr_eq(&shared_ptr, &shared_mesh));

    let original_unique = scene.get(unique).unwrap().model().unwrap().mesh.clone();
    let cloned_unique = scene.get(unique_clone).unwrap().model().unwrap().mesh.clone();
    assert!(!Arc::ptr_eq(&original_unique, &cloned_unique));
}

#[test]
fn clone_remaps_grid_connections() {
    let mut scene = Scene::new("test");
    let grid = scene.add_node(Node::new("grid", NodeKind::Grid(Grid::default())));
    let a = scene.insert_child(grid, Node::new("a", NodeKind::GridPoint(GridPoint::default())));
    let b = scene.insert_child(grid, Node::new("b", NodeKind::GridPoint(GridPoint::default())));
    scene.grid_connect(a, b);

    let cloned_grid = scene.clone_subtree(grid).unwrap();
    let cloned_points = scene.grid_points(cloned_grid);
    assert_eq!(cloned_points.len(), 2);

    // Connections point at the cloned points, not the originals.
    let connections = &scene
        .get(cloned_points[0])
        .unwrap()
        .grid_point()
        .unwrap()
        .connections;
    assert_eq!(connections.len(), 1);
    assert!(cloned_points.contains(&connections[0]));
    assert_ne!(connections[0], a);
    assert_ne!(connections[0], b);
}

#[test]
fn grid_pathfinding_follows_connections() {
    let mut scene = Scene::new("test");
    let grid = scene.add_node(Node::new("grid", NodeKind::Grid(Grid::default())));
    let mut points = Vec::new();
    for i in 0..4 {
        let p = scene.insert_child(
            grid,
            Node::new(format!("p{i}"), NodeKind::GridPoint(GridPoint::default())),
        );
        scene.set_local_position(p, Vec3::new(i as f32, 0.0, 0.0));
        points.push(p);
    }
    scene.grid_connect(points[0], points[1]);
    scene.grid_connect(points[1], points[2]);
    scene.grid_connect(points[2], points[3]);
    // Long shortcut that should lose to the chain.
    scene.grid_connect(points[0], points[3]);
    scene.set_local_position(points[3], Vec3::new(3.0, 0.0, 0.0));

    let path = scene.grid_path(points[0], points[3]).unwrap();
    assert_eq!(path.first(), Some(&points[0]));
    assert_eq!(path.last(), Some(&points[3]));

    let nearest = scene.nearest_grid_point(grid, Vec3::new(2.2, 0.0, 0.0));
    assert_eq!(nearest, Some(points[2]));

    scene.grid_disconnect(points[1], points[2]);
    scene.grid_disconnect(points[0], points[3]);
    assert!(scene.grid_path(points[0], points[3]).is_none());
}

#[test]
fn path_sampling_walks_waypoints() {
    let mut scene = Scene::new("test");
    let path = scene.add_node(Node::new("path", NodeKind::Path(Path::new(false))));
    for (i, x) in [0.0_f32, 10.0].iter().enumerate() {
        let p = scene.insert_child(path, Node::empty(format!("wp{i}")));
        scene.set_local_position(p, Vec3::new(*x, 0.0, 0.0));
    }

    assert!((scene.path_length(path) - 10.0).abs() < 1e-4);
    let mid = scene.path_position_at(path, 0.5).unwrap();
    assert!((mid - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);

    // Closing the path doubles its length back to the start.
    if let NodeKind::Path(p) = &mut scene.get_mut(path).unwrap().kind {
        p.closed = true;
    }
    assert!((scene.path_length(path) - 20.0).abs() < 1e-4);
}

#[test]
fn sector_neighbors_by_overlap_and_shared_vertices() {
    let mut scene = Scene::new("test");
    let make_sector = |scene: &mut Scene, name: &str, x: f32| {
        let sector = Sector::new(Dimensions::from_center_size(Vec3::ZERO, Vec3::splat(2.0)));
        let handle = scene.add_node(Node::new(name, NodeKind::Sector(sector)));
        scene.set_local_position(handle, Vec3::new(x, 0.0, 0.0));
        handle
    };
    let a = make_sector(&mut scene, "a", 0.0);
    let b = make_sector(&mut scene, "b", 2.0);
    let c = make_sector(&mut scene, "c", 10.0);

    scene.update_sector_neighbors(SectorDetection::Overlap);
    assert_eq!(scene.get(a).unwrap().sector().unwrap().neighbors(), &[b]);
    assert!(scene.get(c).unwrap().sector().unwrap().neighbors().is_empty());

    scene.update_sector_neighbors(SectorDetection::SharedVertices);
    assert_eq!(scene.get(a).unwrap().sector().unwrap().neighbors(), &[b]);

    let hood = scene.sector_neighborhood(a, 1);
    assert!(hood.contains(&a) && hood.contains(&b) && !hood.contains(&c));

    assert_eq!(scene.sector_containing(Vec3::new(10.2, 0.0, 0.0)), Some(c));
}

#[test]
fn properties_round_trip_all_kinds() {
    let mut scene = Scene::new("test");
    let node = scene.add_node(Node::empty("n"));
    let props = &mut scene.get_mut(node).unwrap().properties;
    props.set("flag", true);
    props.set("count", 3_i64);
    props.set("ratio", 0.25_f32);
    props.set("label", "door");
    props.set("tint", Color::rgb(1.0, 0.5, 0.0));
    props.set("size", glam::Vec2::new(4.0, 3.0));
    props.set("offset", Vec3::new(1.0, 2.0, 3.0));

    let props = &scene.get(node).unwrap().properties;
    assert_eq!(props.get("flag").and_then(|p| p.as_bool()), Some(true));
    assert_eq!(props.get("count").and_then(|p| p.as_int()), Some(3));
    assert_eq!(props.get("ratio").and_then(|p| p.as_float()), Some(0.25));
    assert_eq!(props.get("label").and_then(|p| p.as_str()), Some("door"));
    assert_eq!(
        props.get("tint").and_then(|p| p.as_color()),
        Some(Color::rgb(1.0, 0.5, 0.0))
    );
    assert_eq!(props.len(), 7);
}

#[test]
fn dynamic_batch_capacity_is_enforced() {
    let mut scene = Scene::new("test");
    let mesh = Arc::new(primitives::uv_sphere(1.0, 64, 64));
    let owner = scene.add_node(Node::new(
        "owner",
        NodeKind::Model(Box::new(Model::new(mesh.clone()))),
    ));
    let members: Vec<_> = (0..3)
        .map(|i| {
            scene.add_node(Node::new(
                format!("member{i}"),
                NodeKind::Model(Box::new(Model::new(mesh.clone()))),
            ))
        })
        .collect();

    // 64x64 sphere is 8192 triangles; four copies exceed 21845.
    let result = scene.dynamic_batch_add(owner, 0, &members);
    assert!(matches!(
        result,
        Err(kiln::KilnError::BatchCapacity { .. })
    ));

    // Two fit.
    scene.dynamic_batch_add(owner, 0, &members[..1]).unwrap();
    assert_eq!(
        scene.get(owner).unwrap().model().unwrap().batch_members(),
        &members[..1]
    );
    assert_eq!(
        scene.get(members[0]).unwrap().model().unwrap().batch_owner(),
        Some(owner)
    );

    scene.dynamic_batch_remove(owner, &members[..1]);
    assert!(scene.get(owner).unwrap().model().unwrap().batch_members().is_empty());
}

//! Scene scenario tests

mod creation;

use crate::scene::{AttributeChange, CreateFlags, Scene, SceneConfig};

/// Flag sets for every replicated/temporary combination
pub(super) fn flag_grid() -> Vec<(bool, bool, CreateFlags)> {
    let mut grid = Vec::new();
    for replicated in [true, false] {
        for temporary in [true, false] {
            let mut flags = CreateFlags::empty();
            flags.set(CreateFlags::REPLICATED, replicated);
            flags.set(CreateFlags::COMPONENTS_REPLICATED, replicated);
            flags.set(CreateFlags::TEMPORARY, temporary);
            grid.push((replicated, temporary, flags));
        }
    }
    grid
}

/// Authority scene with a small hierarchy:
/// 1 "Root" (Name, Placeable) -> 2 "Child" (Name, Mesh, DynamicComponent)
/// plus 3 "Light" at root level
pub(super) fn populated_scene() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = Scene::new("populated", SceneConfig::default());
    let change = AttributeChange::Default;

    let mut root = scene.create_entity(0, &["Placeable"], change, CreateFlags::default()).unwrap();
    root.set_name("Root", change).unwrap();
    root.set_attribute("Placeable", "visible", false, change).unwrap();

    let mut child = root.create_child(0, &["Mesh", "DynamicComponent"], change, CreateFlags::default()).unwrap();
    child.set_name("Child", change).unwrap();
    child.set_group("props", change).unwrap();
    child
        .set_attribute("Mesh", "meshRef", crate::foundation::AssetReference::new("crate.mesh"), change)
        .unwrap();
    let dynamic = child.component("DynamicComponent").unwrap().id();
    assert!(child.create_dynamic_attribute(dynamic, "real", "health", change));
    child.set_attribute("DynamicComponent", "health", 75.5f32, change).unwrap();

    let mut light = scene.create_entity(0, &["Light"], change, CreateFlags::default()).unwrap();
    light.set_name("Light", change).unwrap();

    scene.drain_events();
    scene
}

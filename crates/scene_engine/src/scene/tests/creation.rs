use super::flag_grid;
use crate::scene::{AttributeChange, ComponentRegistry, Scene, SceneConfig, SceneManager};

#[test]
fn test_create_entity_on_client_scene() {
    let mut scene = Scene::new("client", SceneConfig::default().with_authority(false));
    let key = scene.key();

    for (replicated, temporary, flags) in flag_grid() {
        let entity = scene.create_entity(0, &[], AttributeChange::Default, flags).unwrap();
        assert_eq!(entity.scene(), key);
        assert!(entity.parent().is_none());

        assert_eq!(entity.is_replicated(), replicated);
        // a client needs the authority to acknowledge replicated entities
        assert_eq!(entity.is_unacked(), replicated);
        assert_eq!(entity.is_temporary(), temporary);

        assert_eq!(entity.name(), "");
        assert_eq!(entity.description(), "");
        assert_eq!(entity.group(), "");
        assert_eq!(entity.num_components(), 0);
        assert_eq!(entity.num_children(), 0);

        let id = entity.id();
        assert!(scene.remove_entity(id, AttributeChange::Default));
        assert!(!scene.remove_entity(id, AttributeChange::Default));
    }
    assert!(scene.is_empty());
}

#[test]
fn test_create_components_unparented() {
    let manager = SceneManager::default();
    for type_name in manager.component_types() {
        let type_id = manager.component_type_id_for_name(&type_name);
        assert!(manager.is_component_type_registered(&type_name));

        let by_name = manager.create_component_by_name(&type_name).unwrap();
        assert!(by_name.parent_scene().is_none());
        assert!(by_name.parent_entity().is_none());
        assert_eq!(by_name.type_id(), type_id);
        assert_eq!(by_name.type_name(), type_name);

        let by_id = manager.create_component_by_id(type_id).unwrap();
        assert!(by_id.parent_scene().is_none());
        assert_eq!(by_id.type_name(), type_name.as_str());
    }
}

#[test]
fn test_create_components_parented() {
    let types = ComponentRegistry::with_builtins().component_types();
    let mut scene = Scene::new("parented", SceneConfig::default());
    let key = scene.key();

    for type_name in &types {
        for (replicated, temporary, flags) in flag_grid() {
            let mut parent = scene.create_entity(0, &[], AttributeChange::Default, flags).unwrap();
            let parent_id = parent.id();

            let by_name = parent
                .create_component(type_name.as_str(), "ByName", AttributeChange::Default, replicated)
                .unwrap();
            assert_eq!(by_name.parent_scene(), Some(key));
            assert_eq!(by_name.parent_entity(), Some(parent_id));
            assert_eq!(by_name.is_temporary(), temporary);
            let type_id = by_name.type_id();

            let by_id = parent
                .create_component(type_id, "ById", AttributeChange::Default, replicated)
                .unwrap();
            assert_eq!(by_id.parent_entity(), Some(parent_id));
            assert_eq!(by_id.type_name(), type_name.as_str());
            assert_eq!(by_id.is_temporary(), temporary);

            assert_eq!(parent.components_of_type(type_id).len(), 2);
            assert!(scene.remove_entity(parent_id, AttributeChange::Default));
        }
    }
}

#[test]
fn test_remove_entity_takes_subtree() {
    let mut scene = super::populated_scene();
    assert_eq!(scene.len(), 3);
    assert!(scene.remove_entity(1, AttributeChange::Default));
    assert!(!scene.has_entity(2));
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.entity_by_name("Light").unwrap().id(), 3);
}

#[test]
fn test_queries() {
    let scene = super::populated_scene();
    assert_eq!(scene.entities_with_component("Mesh", None).len(), 1);
    assert_eq!(scene.entities_of_group("props")[0].name(), "Child");
    assert_eq!(scene.find_entities_by_name("child", false).len(), 1);
    assert!(scene.find_entities_by_name("child", true).is_empty());
    assert_eq!(scene.find_entities_containing("i", false).len(), 2);
    assert_eq!(scene.root_level_entities().count(), 2);
    assert!(!scene.is_unique_name("Root"));
    assert!(scene.is_unique_name("Missing"));
}

//! Tests for repeater materialization, list mutations and virtualization.
mod common;
use common::*;
use serde_json::{Value as JsonValue, json};
use yoshiki::definition::{LayoutNode, RepeaterNode};
use yoshiki::error::RepeaterError;
use yoshiki::path::RepeaterContext;
use yoshiki::repeater::{self, ItemKey, RepeaterHandle, VirtualWindow};

fn repeater_node(json: JsonValue) -> RepeaterNode {
    match serde_json::from_value(json).expect("repeater must deserialize") {
        LayoutNode::Repeater(node) => node,
        other => panic!("expected a repeater, got {}", other.type_name()),
    }
}

fn spells() -> JsonValue {
    json!({
        "spells": [
            { "id": "fb", "name": "Fireball" },
            { "id": "mm", "name": "Magic Missile" },
            { "name": "Shield" }
        ],
        "notes": "none",
        "empty": null
    })
}

#[cfg(test)]
mod materialize_tests {
    use super::*;

    #[test]
    fn test_one_item_per_element_with_keys() {
        let node = repeater_node(json!({
            "type": "repeater", "id": "spells", "binding": "spells", "keyField": "id"
        }));
        let entity = spells();
        let materialized = repeater::materialize(&node, &entity, None).unwrap();

        assert_eq!(materialized.path, "spells");
        assert_eq!(materialized.items.len(), 3);
        assert_eq!(materialized.items[0].key, ItemKey::Field("fb".to_string()));
        assert_eq!(materialized.items[1].key, ItemKey::Field("mm".to_string()));
        // No key value falls back to the position.
        assert_eq!(materialized.items[2].key, ItemKey::Position(2));
        assert_eq!(materialized.items[1].context.index, 1);
        assert_eq!(materialized.items[1].value()["name"], json!("Magic Missile"));
    }

    #[test]
    fn test_positional_keys_without_key_field() {
        let node = repeater_node(json!({ "type": "repeater", "id": "s", "binding": "spells" }));
        let entity = spells();
        let keys: Vec<ItemKey> = repeater::materialize(&node, &entity, None)
            .unwrap()
            .items
            .into_iter()
            .map(|item| item.key)
            .collect();
        assert_eq!(
            keys,
            vec![ItemKey::Position(0), ItemKey::Position(1), ItemKey::Position(2)]
        );
    }

    #[test]
    fn test_absent_or_null_binding_is_empty() {
        let entity = spells();
        for binding in ["missing", "empty"] {
            let node = repeater_node(json!({ "type": "repeater", "id": "r", "binding": binding }));
            let materialized = repeater::materialize(&node, &entity, None).unwrap();
            assert!(materialized.items.is_empty(), "{} should be empty", binding);
        }
    }

    #[test]
    fn test_non_array_binding_is_an_error() {
        let node = repeater_node(json!({ "type": "repeater", "id": "r", "binding": "notes" }));
        let err = repeater::materialize(&node, &spells(), None).unwrap_err();
        assert_eq!(err, RepeaterError::NotAnArray("notes".to_string()));
    }

    #[test]
    fn test_nested_repeater_frames() {
        let entity = json!({
            "classes": [
                { "features": ["a"] },
                { "features": ["b", "c"] }
            ]
        });
        let outer_item = &entity["classes"][1];
        let outer = RepeaterContext::root(1, outer_item);
        let node = repeater_node(json!({
            "type": "repeater", "id": "features", "binding": "classes[{{index}}].features"
        }));

        let materialized = repeater::materialize(&node, &entity, Some(&outer)).unwrap();
        assert_eq!(materialized.path, "classes[1].features");
        assert_eq!(materialized.values(), vec![json!("b"), json!("c")]);
        assert_eq!(materialized.items[1].context.indices(), vec![1, 1]);
        assert_eq!(materialized.items[1].context.depth(), 2);
    }
}

#[cfg(test)]
mod mutation_tests {
    use super::*;

    #[test]
    fn test_pure_list_operations() {
        let items = vec![json!(1), json!(2), json!(3)];

        assert_eq!(
            repeater::insert_at(&items, 1, json!(9)),
            vec![json!(1), json!(9), json!(2), json!(3)]
        );
        assert_eq!(
            repeater::insert_at(&items, 99, json!(9)),
            vec![json!(1), json!(2), json!(3), json!(9)]
        );
        assert_eq!(
            repeater::remove_at(&items, 0),
            Some(vec![json!(2), json!(3)])
        );
        assert_eq!(repeater::remove_at(&items, 3), None);
        assert_eq!(
            repeater::move_item(&items, 0, 2),
            Some(vec![json!(2), json!(3), json!(1)])
        );
        assert_eq!(
            repeater::move_item(&items, 2, 0),
            Some(vec![json!(3), json!(1), json!(2)])
        );
        assert_eq!(repeater::move_item(&items, 0, 3), None);
    }

    #[test]
    fn test_handle_emits_whole_array_once() {
        let sink = RecordingSink::new();
        let handle = RepeaterHandle::new(
            "inventory",
            vec![json!({ "name": "Rope" }), json!({ "name": "Torch" })],
            Some(json!({ "name": "" })),
            sink.clone(),
        );

        handle.insert_at(1);
        handle.remove_at(0).unwrap();
        handle.move_item(1, 0).unwrap();

        assert_eq!(
            sink.changes(),
            vec![
                (
                    "inventory".to_string(),
                    json!([{ "name": "Rope" }, { "name": "" }, { "name": "Torch" }])
                ),
                ("inventory".to_string(), json!([{ "name": "Torch" }])),
                (
                    "inventory".to_string(),
                    json!([{ "name": "Torch" }, { "name": "Rope" }])
                ),
            ]
        );
    }

    #[test]
    fn test_handle_rejects_out_of_range_indices() {
        let sink = RecordingSink::new();
        let handle = RepeaterHandle::new("list", vec![json!(1)], None, sink.clone());

        assert_eq!(
            handle.remove_at(4),
            Err(RepeaterError::IndexOutOfRange {
                path: "list".to_string(),
                index: 4,
                len: 1,
            })
        );
        assert!(matches!(
            handle.move_item(0, 2),
            Err(RepeaterError::IndexOutOfRange { index: 2, .. })
        ));
        assert!(sink.changes().is_empty());
    }

    #[test]
    fn test_default_new_item_is_empty_object() {
        let sink = RecordingSink::new();
        let handle = RepeaterHandle::new("list", Vec::new(), None, sink.clone());
        assert!(handle.is_empty());

        handle.insert_at(0);
        assert_eq!(sink.last(), Some(("list".to_string(), json!([{}]))));
    }

    #[test]
    fn test_handle_for_node() {
        let sink = RecordingSink::new();
        let node = repeater_node(json!({
            "type": "repeater", "id": "s", "binding": "spells", "newItem": { "name": "New spell" }
        }));
        let handle = RepeaterHandle::for_node(&node, &spells(), None, sink.clone()).unwrap();

        assert_eq!(handle.path(), "spells");
        assert_eq!(handle.len(), 3);
        handle.insert_at(0);
        let (_, value) = sink.last().unwrap();
        assert_eq!(value[0], json!({ "name": "New spell" }));
        assert_eq!(value.as_array().map(Vec::len), Some(4));
    }
}

#[cfg(test)]
mod window_tests {
    use super::*;

    #[test]
    fn test_visible_window() {
        let window = VirtualWindow::new(20.0);
        assert_eq!(window.visible_window(100, 0.0, 100.0), 0..5);
        assert_eq!(window.visible_window(100, 50.0, 100.0), 2..8);
        assert_eq!(window.visible_window(100, 1990.0, 100.0), 99..100);
    }

    #[test]
    fn test_overscan_is_clamped() {
        let window = VirtualWindow::new(20.0).with_overscan(3);
        assert_eq!(window.visible_window(100, 0.0, 100.0), 0..8);
        assert_eq!(window.visible_window(100, 200.0, 100.0), 7..18);
        assert_eq!(window.visible_window(10, 150.0, 100.0), 4..10);
    }

    #[test]
    fn test_edge_cases() {
        let window = VirtualWindow::new(20.0);
        assert_eq!(window.visible_window(0, 0.0, 100.0), 0..0);
        assert_eq!(window.visible_window(5, 500.0, 100.0), 5..5);
        assert_eq!(window.visible_window(5, -40.0, 40.0), 0..2);
        assert_eq!(VirtualWindow::new(0.0).visible_window(5, 0.0, 10.0), 0..5);
        assert_eq!(VirtualWindow::new(f64::NAN).visible_window(5, 0.0, 10.0), 0..5);
    }

    #[test]
    fn test_spacer_heights() {
        let window = VirtualWindow::new(20.0);
        let range = window.visible_window(100, 50.0, 100.0);
        assert_eq!(window.leading_space(&range), 40.0);
        assert_eq!(window.trailing_space(&range, 100), 1840.0);
    }
}

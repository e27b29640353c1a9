//! Tests for data path resolution, templates and repeater contexts.
use serde_json::json;
use yoshiki::error::PathError;
use yoshiki::path::{self, PathSegment, RepeaterContext, Template, TemplatePart};

#[cfg(test)]
mod path_tests {
    use super::*;

    #[test]
    fn test_lookup_nested_keys_and_indices() {
        let entity = json!({
            "attributes": { "strength": { "value": 16 } },
            "inventory": [{ "name": "Rope" }, { "name": "Torch" }]
        });

        assert_eq!(
            path::lookup(&entity, "attributes.strength.value"),
            Some(&json!(16))
        );
        assert_eq!(path::lookup(&entity, "inventory[1].name"), Some(&json!("Torch")));
        assert_eq!(path::lookup(&entity, "inventory.0.name"), Some(&json!("Rope")));
        assert_eq!(path::lookup(&entity, ""), Some(&entity));
    }

    #[test]
    fn test_lookup_missing_data_is_undefined() {
        let entity = json!({ "a": null, "list": [1, 2] });

        assert_eq!(path::lookup(&entity, "missing"), None);
        assert_eq!(path::lookup(&entity, "a.b"), None);
        assert_eq!(path::lookup(&entity, "list[5]"), None);
        assert_eq!(path::lookup(&entity, "list.name"), None);
    }

    #[test]
    fn test_numeric_keys_on_objects() {
        let entity = json!({ "slots": { "1": "ring", "2": "amulet" } });
        assert_eq!(path::lookup(&entity, "slots.2"), Some(&json!("amulet")));
    }

    #[test]
    fn test_concretize_uses_innermost_index() {
        let outer_item = json!({ "entries": [] });
        let inner_item = json!("x");
        let outer = RepeaterContext::root(2, &outer_item);
        let inner = outer.push(7, &inner_item);

        assert_eq!(
            path::concretize("items[{{index}}].name", Some(&outer)).unwrap(),
            "items[2].name"
        );
        assert_eq!(
            path::concretize("rows.{{index}}", Some(&inner)).unwrap(),
            "rows.7"
        );
        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.indices(), vec![2, 7]);
        assert_eq!(inner.parent().map(|p| p.index), Some(2));
    }

    #[test]
    fn test_index_outside_repeater_is_an_error() {
        let result = path::concretize("items[{{index}}]", None);
        assert!(matches!(
            result,
            Err(PathError::MissingRepeaterContext { path: ref p }) if p == "items[{{index}}]"
        ));
    }

    #[test]
    fn test_unknown_placeholder_is_an_error() {
        let result = path::concretize("items.{{slot}}", None);
        assert!(matches!(
            result,
            Err(PathError::UnknownPlaceholder { ref name, .. }) if name == "slot"
        ));
    }

    #[test]
    fn test_resolve_inside_repeater() {
        let entity = json!({ "spells": [{ "level": 1 }, { "level": 3 }] });
        let item = json!({ "level": 3 });
        let context = RepeaterContext::root(1, &item);

        let resolved = path::resolve(&entity, "spells[{{index}}].level", Some(&context)).unwrap();
        assert_eq!(resolved, Some(&json!(3)));
    }

    #[test]
    fn test_segments_treat_both_index_spellings_alike() {
        assert_eq!(
            path::parse_segments("a.b[2].c"),
            path::parse_segments("a.b.2.c")
        );
        assert_eq!(
            path::parse_segments("grid[1][2]"),
            vec![
                PathSegment::Key("grid".to_string()),
                PathSegment::Index(1),
                PathSegment::Index(2)
            ]
        );
        // Malformed brackets are kept verbatim.
        assert_eq!(
            path::parse_segments("a[x]"),
            vec![PathSegment::Key("a[x]".to_string())]
        );
    }

    #[test]
    fn test_overlaps_is_segment_wise() {
        assert!(path::overlaps("attributes", "attributes.strength"));
        assert!(path::overlaps("attributes.strength", "attributes"));
        assert!(path::overlaps("items[0].weight", "items.0"));
        assert!(!path::overlaps("attributes.str", "attributes.strength"));
        assert!(!path::overlaps("a.b", "a.c"));
    }

    #[test]
    fn test_static_prefix() {
        assert_eq!(path::static_prefix("items[{{index}}].weight"), "items");
        assert_eq!(path::static_prefix("rows.{{index}}.cells"), "rows");
        assert_eq!(path::static_prefix("attributes.strength"), "attributes.strength");
        assert!(path::is_prefix("items", "items.0.weight"));
        assert!(!path::is_prefix("items.0.weight", "items"));
    }

    #[test]
    fn test_template_parts_and_escape() {
        let template = Template::parse(r"Hello {{name}}, \{{not}} {{ level }}");
        assert_eq!(
            template.parts(),
            &[
                TemplatePart::Literal("Hello ".to_string()),
                TemplatePart::Placeholder("name".to_string()),
                TemplatePart::Literal(", {{not}} ".to_string()),
                TemplatePart::Placeholder("level".to_string()),
            ][..]
        );
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["name", "level"]);
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let template = Template::parse("cost {{gold");
        assert!(!template.has_placeholders());
        assert_eq!(template.render(|_| String::new()), "cost {{gold");
    }

    #[test]
    fn test_substitute_keeps_unbound_placeholders() {
        let template = Template::parse("{{list}}[{{index}}].name");
        let substituted = template.substitute(|name| (name == "list").then(|| "gear".to_string()));
        assert_eq!(substituted.to_string(), "gear[{{index}}].name");
    }
}

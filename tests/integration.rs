//! End-to-end tests: definition in, computed values and resolved tree out.
mod common;
use common::*;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use yoshiki::definition::ResultType;
use yoshiki::prelude::*;

fn definition_with(computed_fields: JsonValue) -> FormDefinition {
    FormDefinition::from_json_value(json!({
        "gameSystemId": "test",
        "entityType": "sheet",
        "version": 1,
        "computedFields": computed_fields
    }))
    .expect("definition must parse")
}

fn number(values: &ComputedValues, id: &str) -> Option<f64> {
    values.value(id).and_then(JsonValue::as_f64)
}

struct Double;

impl FormulaFunction for Double {
    fn name(&self) -> &str {
        "double"
    }

    fn call(&self, args: &[Value]) -> std::result::Result<Value, EvalError> {
        match args {
            [arg] => arg
                .as_arithmetic_number()
                .map(|n| Value::Number(n * 2.0))
                .ok_or_else(|| EvalError::UnknownVariable("double expects a number".to_string())),
            _ => Err(EvalError::Arity {
                name: "double".to_string(),
                expected: "1".to_string(),
                found: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod computation_tests {
    use super::*;

    #[test]
    fn test_compute_all_on_sample_sheet() {
        let engine = FormEngine::new(character_sheet());
        assert!(engine.load_diagnostics().is_empty());

        let values = engine.compute_all(&wizard());
        assert_eq!(number(&values, "strMod"), Some(-1.0));
        assert_eq!(number(&values, "dexMod"), Some(2.0));
        assert_eq!(number(&values, "totalWeight"), Some(5.0));
        assert_eq!(number(&values, "intMod"), Some(4.0));
        assert_eq!(number(&values, "spellDc"), Some(15.0));
        assert_eq!(values.failures().count(), 0);

        // intMod must be evaluated before spellDc reads it.
        let order: Vec<&str> = values.iter().map(|(id, _)| id).collect();
        let position = |id: &str| order.iter().position(|o| *o == id).unwrap();
        assert!(position("intMod") < position("spellDc"));
    }

    #[test]
    fn test_recompute_only_touches_affected_fields() {
        let engine = FormEngine::new(character_sheet());
        let mut entity = wizard();
        let before = engine.compute_all(&entity);

        assert_eq!(
            engine.affected_by("attributes.intelligence"),
            vec!["intMod", "spellDc"]
        );
        assert!(engine.affected_by("name").is_empty());

        entity["attributes"]["intelligence"] = json!(20);
        // A stale value for an unaffected field shows it was not re-evaluated.
        let mut previous = before.clone();
        previous.insert("strMod", ComputedValue::Value(json!(99)));

        let after = engine.recompute(&entity, "attributes.intelligence", &previous);
        assert_eq!(number(&after, "intMod"), Some(5.0));
        assert_eq!(number(&after, "spellDc"), Some(16.0));
        assert_eq!(number(&after, "strMod"), Some(99.0));
    }

    #[test]
    fn test_inventory_change_recomputes_weight() {
        let engine = FormEngine::new(character_sheet());
        let mut entity = wizard();
        let before = engine.compute_all(&entity);

        entity["inventory"][2]["carried"] = json!(true);
        let after = engine.recompute(&entity, "inventory[2].carried", &before);
        assert_eq!(number(&after, "totalWeight"), Some(25.0));
        assert_eq!(after.get("dexMod"), before.get("dexMod"));
    }

    #[test]
    fn test_custom_function_and_alias() {
        let definition = definition_with(json!({
            "twice": { "formula": "double(@level)", "dependencies": ["level"] },
            "mod": { "formula": "modifier((@score - 10) / 2)", "dependencies": ["score"] }
        }));
        let engine = FormEngine::builder(definition)
            .with_function(Box::new(Double))
            .with_function_alias("modifier", "floor")
            .with_function_alias("broken", "doesNotExist")
            .build();

        let values = engine.compute_all(&json!({ "level": 4, "score": 13 }));
        assert_eq!(number(&values, "twice"), Some(8.0));
        assert_eq!(number(&values, "mod"), Some(1.0));
    }

    #[test]
    fn test_result_type_coercion() {
        let definition = definition_with(json!({
            "text": { "formula": "@level * 2", "resultType": "string", "dependencies": ["level"] },
            "flag": { "formula": "@level > 3", "resultType": "boolean", "dependencies": ["level"] },
            "fromText": { "formula": "@bonus", "dependencies": ["bonus"] },
            "absent": { "formula": "@missing", "dependencies": ["missing"] },
            "notNumber": { "formula": "@name", "dependencies": ["name"] }
        }));
        assert_eq!(
            definition.computed_fields["text"].result_type,
            ResultType::String
        );

        let engine = FormEngine::new(definition);
        let values = engine.compute_all(&json!({ "level": 5, "bonus": "3", "name": "Sam" }));
        assert_eq!(values.value("text"), Some(&json!("10")));
        assert_eq!(values.value("flag"), Some(&json!(true)));
        assert_eq!(values.value("fromText"), Some(&json!(3)));
        assert_eq!(values.value("absent"), Some(&JsonValue::Null));
        assert!(values.get("notNumber").unwrap().is_failed());
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_fields_reading_a_cycle_fail_upstream() {
        let definition = definition_with(json!({
            "a": { "formula": "@computed.b + 1", "dependencies": ["computed.b"] },
            "b": { "formula": "@computed.a + 1", "dependencies": ["computed.a"] },
            "fallback": { "formula": "@computed.a || 5", "dependencies": ["computed.a"] },
            "next": { "formula": "@computed.a + 1", "dependencies": ["computed.a"] },
            "free": { "formula": "@level", "dependencies": ["level"] }
        }));
        let engine = FormEngine::new(definition);
        let entity = json!({ "level": 2 });
        let upstream = EvalError::UpstreamFailed("a".to_string()).to_string();

        let values = engine.compute_all(&entity);
        for id in ["fallback", "next"] {
            let error = values
                .get(id)
                .and_then(ComputedValue::error)
                .unwrap_or_else(|| panic!("{} should fail", id));
            assert_eq!(error.message, upstream);
        }
        assert_eq!(number(&values, "free"), Some(2.0));

        // Recomputing from scratch agrees with a full pass.
        let recomputed = engine.recompute(&entity, "computed.a", &ComputedValues::new());
        assert_eq!(recomputed.get("fallback"), values.get("fallback"));
        assert_eq!(recomputed.get("next"), values.get("next"));
    }

    #[test]
    fn test_load_diagnostics() {
        let definition = definition_with(json!({
            "broken": { "formula": "1 +", "dependencies": [] },
            "a": { "formula": "@computed.b + 1", "dependencies": ["computed.b"] },
            "b": { "formula": "@computed.a + 1", "dependencies": ["computed.a"] },
            "sneaky": { "formula": "@level + @bonus", "dependencies": ["level"] }
        }));
        let engine = FormEngine::new(definition);
        let diagnostics = engine.load_diagnostics();

        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::FormulaSyntax { field_id, .. } if field_id == "broken"
        )));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UndeclaredDependency { field_id, path } if field_id == "sneaky" && path == "bonus"
        )));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::DependencyCycle { cycle } if cycle == &["a", "b", "a"]
        )));
        assert_eq!(diagnostics.len(), 3);

        // Undeclared reads still schedule the field.
        assert_eq!(engine.affected_by("bonus"), vec!["sneaky"]);

        let values = engine.compute_all(&json!({ "level": 2, "bonus": 1 }));
        assert_eq!(number(&values, "sneaky"), Some(3.0));
        assert!(values.get("broken").unwrap().is_failed());
        assert_eq!(
            values.get("a").and_then(ComputedValue::error).map(|e| e.message.as_str()),
            Some("field is part of a dependency cycle")
        );
    }

    #[test]
    fn test_failure_is_isolated_and_propagates_downstream() {
        let definition = FormDefinition::from_json_value(json!({
            "gameSystemId": "test",
            "entityType": "sheet",
            "layout": [
                { "type": "computed", "id": "ratio-view", "fieldId": "ratio" },
                { "type": "computed", "id": "ok-view", "fieldId": "ok" }
            ],
            "computedFields": {
                "ratio": { "formula": "@level / @divisor", "dependencies": ["level", "divisor"] },
                "scaled": { "formula": "@computed.ratio * 10", "dependencies": ["computed.ratio"] },
                "ok": { "formula": "@level + 1", "dependencies": ["level"] }
            }
        }))
        .unwrap();
        let engine = FormEngine::new(definition);
        let entity = json!({ "level": 6, "divisor": 0 });
        let values = engine.compute_all(&entity);

        let ratio = values.get("ratio").unwrap();
        assert_eq!(ratio.error().map(|e| e.message.as_str()), Some("Division by zero"));
        let scaled = values.get("scaled").and_then(ComputedValue::error).unwrap();
        assert_eq!(
            scaled.message,
            EvalError::UpstreamFailed("ratio".to_string()).to_string()
        );
        assert_eq!(number(&values, "ok"), Some(7.0));

        let resolution = engine.resolve_with(&entity, &values, &ResolveOptions::new(), Arc::new(NoopSink));
        assert_eq!(resolution.diagnostics.len(), 2);
        assert!(resolution
            .diagnostics
            .iter()
            .all(|d| matches!(d, Diagnostic::Formula(_))));
        let Some(ResolvedNode::Computed(view)) = resolution.find("ratio-view") else {
            panic!("expected computed");
        };
        assert!(view.value.as_ref().unwrap().is_failed());
        let Some(ResolvedNode::Computed(ok)) = resolution.find("ok-view") else {
            panic!("expected computed");
        };
        assert_eq!(ok.value, Some(ComputedValue::Value(json!(7))));

        // Fixing the input recovers the whole chain.
        let fixed = json!({ "level": 6, "divisor": 2 });
        let values = engine.recompute(&fixed, "divisor", &values);
        assert_eq!(number(&values, "ratio"), Some(3.0));
        assert_eq!(number(&values, "scaled"), Some(30.0));
    }
}

#[cfg(test)]
mod definition_tests {
    use super::*;

    #[test]
    fn test_from_file_and_identity() {
        let path = std::env::temp_dir().join(format!("yoshiki-sheet-{}.json", std::process::id()));
        std::fs::write(&path, CHARACTER_SHEET_JSON).unwrap();
        let loaded = FormDefinition::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let engine = FormEngine::new(character_sheet());
        assert!(engine.is_current_for(&loaded));
        assert_eq!(engine.identity().game_system_id, "dnd5e");

        let mut bumped = loaded.clone();
        bumped.version += 1;
        assert!(!engine.is_current_for(&bumped));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = FormDefinition::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(DefinitionError::Io { .. })));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(FormDefinition::from_json_str("{ \"layout\": [").is_err());
    }
}

#[cfg(test)]
mod resolution_tests {
    use super::*;

    #[test]
    fn test_resolving_twice_gives_identical_trees() {
        let engine = FormEngine::new(character_sheet());
        let entity = wizard();

        let first = engine.resolve(&entity, Arc::new(NoopSink));
        let second = engine.resolve(&entity, Arc::new(NoopSink));
        assert_eq!(first, second);
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_full_sheet_resolution() {
        let engine = FormEngine::new(character_sheet());
        let sink = RecordingSink::new();
        let resolution = engine.resolve(&wizard(), sink.clone());

        assert_eq!(
            ids(&resolution.nodes),
            vec!["header", "abilities", "inventory", "total-weight", "spell-note", "long-rest"]
        );

        let Some(ResolvedNode::Container(header)) = resolution.find("header") else {
            panic!("expected section");
        };
        assert_eq!(header.label.as_deref(), Some("Elminster (Level 5)"));

        let Some(ResolvedNode::Field(strength)) = resolution.find("str/score") else {
            panic!("expected field");
        };
        assert_eq!(strength.label.as_deref(), Some("Strength score (8)"));
        let Some(ResolvedNode::Computed(str_mod)) = resolution.find("str/mod") else {
            panic!("expected computed");
        };
        assert_eq!(str_mod.value, Some(ComputedValue::Value(json!(-1))));

        let Some(ResolvedNode::Repeater(inventory)) = resolution.find("inventory") else {
            panic!("expected repeater");
        };
        assert_eq!(inventory.total_count, 3);
        let per_item: Vec<Vec<&str>> = inventory.items.iter().map(|item| ids(&item.children)).collect();
        assert_eq!(
            per_item,
            vec![
                vec!["item-name", "item-weight"],
                vec!["item-name", "item-weight"],
                vec!["item-name"],
            ]
        );
        let ResolvedNode::Field(tent) = &inventory.items[2].children[0] else {
            panic!("expected field");
        };
        assert_eq!(tent.label.as_deref(), Some("Item 2"));
        assert_eq!(tent.value, Some(json!("Tent")));

        let Some(ResolvedNode::Static(note)) = resolution.find("spell-note") else {
            panic!("expected static");
        };
        assert_eq!(note.content, "Spell save DC 15");

        let Some(ResolvedNode::Action(rest)) = resolution.find("long-rest") else {
            panic!("expected action");
        };
        rest.trigger();
        assert_eq!(sink.last(), Some(("hitPoints.current".to_string(), json!(30))));
    }

    #[test]
    fn test_edit_cycle() {
        let engine = FormEngine::new(character_sheet());
        let sink = RecordingSink::new();
        let mut entity = wizard();
        let computed = engine.compute_all(&entity);
        let resolution = engine.resolve_with(&entity, &computed, &ResolveOptions::new(), sink.clone());

        let Some(ResolvedNode::Field(dex)) = resolution.find("dex/score") else {
            panic!("expected field");
        };
        dex.on_change.as_ref().unwrap().emit(json!(18));

        // The host applies the change, then recomputes what it touched.
        let (path, value) = sink.last().unwrap();
        assert_eq!(path, "attributes.dexterity");
        entity["attributes"]["dexterity"] = value;
        let computed = engine.recompute(&entity, &path, &computed);
        let resolution = engine.resolve_with(&entity, &computed, &ResolveOptions::new(), sink.clone());

        let Some(ResolvedNode::Computed(dex_mod)) = resolution.find("dex/mod") else {
            panic!("expected computed");
        };
        assert_eq!(dex_mod.value, Some(ComputedValue::Value(json!(4))));
    }

    #[test]
    fn test_non_caster_gets_else_branch() {
        let engine = FormEngine::new(character_sheet());
        let mut entity = wizard();
        entity["class"] = json!("fighter");
        let resolution = engine.resolve(&entity, Arc::new(NoopSink));
        assert!(resolution.find("spell-note").is_none());
        assert!(matches!(resolution.find("no-spells"), Some(ResolvedNode::Divider(_))));
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = Arc::new(FormEngine::new(character_sheet()));
        let handles: Vec<_> = (0..4)
            .map(|level| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let mut entity = wizard();
                    entity["attributes"]["strength"] = json!(10 + level * 2);
                    number(&engine.compute_all(&entity), "strMod")
                })
            })
            .collect();
        let mods: Vec<Option<f64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(mods, vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
    }
}

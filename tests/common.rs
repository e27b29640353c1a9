//! Common test utilities: a sample character sheet definition, a matching
//! entity and a change sink that records what the engine emits.
use serde_json::{Value as JsonValue, json};
use std::sync::{Arc, Mutex};
use yoshiki::prelude::*;

#[allow(dead_code)]
pub const CHARACTER_SHEET_JSON: &str = r#"
{
    "gameSystemId": "dnd5e",
    "entityType": "character",
    "version": 3,
    "layout": [
        {
            "type": "section",
            "id": "header",
            "label": "{{name}} (Level {{level}})",
            "children": [
                {
                    "type": "field",
                    "id": "name",
                    "label": "Name",
                    "binding": "name",
                    "validation": { "required": true, "maxLength": 40 }
                },
                {
                    "type": "field",
                    "id": "level",
                    "label": "Level",
                    "binding": "level",
                    "fieldType": "number",
                    "validation": { "min": 1, "max": 20 }
                }
            ]
        },
        {
            "type": "grid",
            "id": "abilities",
            "options": { "columns": 3 },
            "children": [
                {
                    "type": "fragmentRef",
                    "id": "str",
                    "fragment": "abilityBlock",
                    "arguments": {
                        "label": { "literal": "Strength" },
                        "score": { "binding": "attributes.strength" },
                        "modifier": { "literal": "strMod" }
                    }
                },
                {
                    "type": "fragmentRef",
                    "id": "dex",
                    "fragment": "abilityBlock",
                    "arguments": {
                        "label": { "literal": "Dexterity" },
                        "score": { "binding": "attributes.dexterity" },
                        "modifier": { "literal": "dexMod" }
                    }
                }
            ]
        },
        {
            "type": "repeater",
            "id": "inventory",
            "binding": "inventory",
            "keyField": "id",
            "itemTemplate": [
                {
                    "type": "field",
                    "id": "item-name",
                    "label": "Item {{index}}",
                    "binding": "inventory[{{index}}].name"
                },
                {
                    "type": "field",
                    "id": "item-weight",
                    "binding": "inventory[{{index}}].weight",
                    "fieldType": "number",
                    "visibility": {
                        "field": "inventory[{{index}}].carried",
                        "operator": "equals",
                        "value": true
                    }
                }
            ]
        },
        {
            "type": "computed",
            "id": "total-weight",
            "label": "Carried weight",
            "fieldId": "totalWeight"
        },
        {
            "type": "conditional",
            "id": "caster",
            "condition": { "field": "class", "operator": "equals", "value": "wizard" },
            "then": [
                { "type": "static", "id": "spell-note", "content": "Spell save DC {{computed.spellDc}}" }
            ],
            "else": [
                { "type": "divider", "id": "no-spells" }
            ]
        },
        {
            "type": "action",
            "id": "long-rest",
            "label": "Long rest",
            "action": "rest",
            "binding": "hitPoints.current",
            "payload": 30
        }
    ],
    "fragments": {
        "abilityBlock": {
            "parameters": [
                { "name": "label" },
                { "name": "score", "kind": "binding" },
                { "name": "modifier" }
            ],
            "layout": [
                {
                    "type": "group",
                    "id": "block",
                    "label": "{{label}}",
                    "children": [
                        {
                            "type": "field",
                            "id": "score",
                            "label": "{{label}} score ({{score}})",
                            "binding": "{{score}}",
                            "fieldType": "number"
                        },
                        { "type": "computed", "id": "mod", "fieldId": "{{modifier}}" }
                    ]
                }
            ]
        }
    },
    "computedFields": {
        "strMod": {
            "formula": "floor((@attributes.strength - 10) / 2)",
            "dependencies": ["attributes.strength"]
        },
        "dexMod": {
            "formula": "floor((@attributes.dexterity - 10) / 2)",
            "dependencies": ["attributes.dexterity"]
        },
        "totalWeight": {
            "formula": "reduce(@inventory, 0, acc + (item.carried ? item.weight : 0))",
            "dependencies": ["inventory"]
        },
        "spellDc": {
            "formula": "8 + @proficiency + @computed.intMod",
            "dependencies": ["proficiency", "computed.intMod"]
        },
        "intMod": {
            "formula": "floor((@attributes.intelligence - 10) / 2)",
            "dependencies": ["attributes.intelligence"]
        }
    }
}
"#;

/// Parses the sample character sheet definition.
#[allow(dead_code)]
pub fn character_sheet() -> FormDefinition {
    FormDefinition::from_json_str(CHARACTER_SHEET_JSON).expect("sample definition must parse")
}

/// A level 5 wizard with a three item inventory.
///
/// Carried weight: 3 (spellbook) + 2 (dagger) = 5; the tent stays at camp.
#[allow(dead_code)]
pub fn wizard() -> JsonValue {
    json!({
        "name": "Elminster",
        "level": 5,
        "class": "wizard",
        "proficiency": 3,
        "attributes": {
            "strength": 8,
            "dexterity": 14,
            "intelligence": 18
        },
        "hitPoints": { "current": 12, "max": 30 },
        "inventory": [
            { "id": "book", "name": "Spellbook", "weight": 3, "carried": true },
            { "id": "dagger", "name": "Dagger", "weight": 2, "carried": true },
            { "id": "tent", "name": "Tent", "weight": 20, "carried": false }
        ]
    })
}

/// Builds a definition from a bare layout with no fragments or computed fields.
#[allow(dead_code)]
pub fn layout_only(layout: JsonValue) -> FormDefinition {
    FormDefinition::from_json_value(json!({
        "gameSystemId": "test",
        "entityType": "sheet",
        "version": 1,
        "layout": layout
    }))
    .expect("layout must parse")
}

/// Records every change emitted through it.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    changes: Mutex<Vec<(String, JsonValue)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn changes(&self) -> Vec<(String, JsonValue)> {
        self.changes.lock().expect("sink lock poisoned").clone()
    }

    pub fn last(&self) -> Option<(String, JsonValue)> {
        self.changes().pop()
    }
}

impl ChangeSink for RecordingSink {
    fn on_change(&self, path: &str, value: JsonValue) {
        self.changes
            .lock()
            .expect("sink lock poisoned")
            .push((path.to_string(), value));
    }
}

/// Ids of the resolved nodes at one level, in output order.
#[allow(dead_code)]
pub fn ids(nodes: &[ResolvedNode]) -> Vec<&str> {
    nodes.iter().map(|node| node.id()).collect()
}

//! # Yoshiki - Declarative Form Layout and Computation Engine
//!
//! **Yoshiki** turns a declarative form definition and a JSON entity (a
//! character sheet, an item card, a monster stat block) into a fully resolved
//! layout tree ready for rendering. A form definition is data: a tree of
//! layout nodes with bindings into the entity, visibility conditions,
//! reusable fragments, repeaters over arrays and computed fields written in a
//! small formula language.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Definition**: Deserialize a `FormDefinition` from JSON.
//! 2.  **Build an Engine**: `FormEngine::builder` parses every formula once,
//!     derives the dependency schedule of the computed fields and reports
//!     load-time problems as diagnostics. Custom formula functions are
//!     registered here.
//! 3.  **Compute**: `compute_all` evaluates every computed field in
//!     dependency order. After an edit, `recompute` re-evaluates only the
//!     fields affected by the changed path.
//! 4.  **Resolve**: `resolve_with` walks the layout and produces
//!     `ResolvedNode`s: visibility applied, fragments expanded, repeaters
//!     materialized (and virtualized), bindings made concrete. Edits flow
//!     back to the host through a `ChangeSink`; the engine never mutates the
//!     entity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yoshiki::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let definition = FormDefinition::from_json_value(json!({
//!         "gameSystemId": "dnd5e",
//!         "entityType": "character",
//!         "version": 1,
//!         "layout": [
//!             { "type": "field", "id": "str", "label": "Strength",
//!               "binding": "attributes.strength", "fieldType": "number" },
//!             { "type": "computed", "id": "str-mod", "label": "Modifier",
//!               "fieldId": "strMod" }
//!         ],
//!         "computedFields": {
//!             "strMod": {
//!                 "formula": "floor((@attributes.strength - 10) / 2)",
//!                 "dependencies": ["attributes.strength"]
//!             }
//!         }
//!     }))?;
//!
//!     let engine = FormEngine::builder(definition).build();
//!     for diagnostic in engine.load_diagnostics() {
//!         eprintln!("warning: {}", diagnostic);
//!     }
//!
//!     let entity = json!({ "attributes": { "strength": 14 } });
//!     let computed = engine.compute_all(&entity);
//!     assert_eq!(computed.value("strMod"), Some(&json!(2)));
//!
//!     let sink: Arc<dyn ChangeSink> = Arc::new(|path: &str, value: serde_json::Value| {
//!         println!("host should write {} = {}", path, value);
//!     });
//!     let resolution = engine.resolve_with(&entity, &computed, &ResolveOptions::default(), sink);
//!
//!     if let Some(ResolvedNode::Field(field)) = resolution.find("str") {
//!         if let Some(handle) = &field.on_change {
//!             handle.emit(json!(15));
//!         }
//!     }
//!
//!     // The host applied the edit; only the affected fields are recomputed.
//!     let entity = json!({ "attributes": { "strength": 15 } });
//!     let computed = engine.recompute(&entity, "attributes.strength", &computed);
//!     assert_eq!(computed.value("strMod"), Some(&json!(2)));
//!
//!     Ok(())
//! }
//! ```

pub mod change;
pub mod condition;
pub mod definition;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod formula;
pub mod fragment;
pub mod path;
pub mod prelude;
pub mod repeater;
pub mod schedule;
pub mod value;
pub mod walker;

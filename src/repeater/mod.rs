//! Repeaters: one item-template instance per element of a bound array.

pub mod window;

pub use window::VirtualWindow;

use crate::change::ChangeSink;
use crate::definition::RepeaterNode;
use crate::error::RepeaterError;
use crate::path::{self, RepeaterContext};
use crate::value::json_display_text;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The identity of a repeated item across renders.
///
/// With a `keyField` the key follows the item wherever it moves. Without one
/// the key is the position, so reordering or removing an item shifts the
/// identity (and any per-item host state) of every item after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ItemKey {
    Field(String),
    Position(usize),
}

/// One materialized item with the context its template resolves under.
#[derive(Debug, Clone)]
pub struct RepeaterItem<'a> {
    pub index: usize,
    pub key: ItemKey,
    pub context: RepeaterContext<'a>,
}

impl<'a> RepeaterItem<'a> {
    pub fn value(&self) -> &'a JsonValue {
        self.context.item
    }
}

#[derive(Debug, Clone)]
pub struct Materialized<'a> {
    /// The concrete path of the bound array.
    pub path: String,
    pub items: Vec<RepeaterItem<'a>>,
}

impl Materialized<'_> {
    pub fn values(&self) -> Vec<JsonValue> {
        self.items.iter().map(|item| item.value().clone()).collect()
    }
}

/// Resolves the repeater's binding and opens one child frame per element,
/// nested under `context`.
///
/// An absent or `null` binding is an empty list. Any other non-array value
/// is an error.
pub fn materialize<'a>(
    node: &RepeaterNode,
    entity: &'a JsonValue,
    context: Option<&'a RepeaterContext<'a>>,
) -> Result<Materialized<'a>, RepeaterError> {
    let concrete = path::concretize(&node.binding, context)?;
    let elements: &'a [JsonValue] = match path::lookup(entity, &concrete) {
        None | Some(JsonValue::Null) => &[],
        Some(JsonValue::Array(elements)) => elements,
        Some(_) => return Err(RepeaterError::NotAnArray(concrete)),
    };

    let items = elements
        .iter()
        .enumerate()
        .map(|(index, element)| RepeaterItem {
            index,
            key: item_key(node.key_field.as_deref(), index, element),
            context: path::enter(context, index, element),
        })
        .collect();

    Ok(Materialized {
        path: concrete,
        items,
    })
}

fn item_key(key_field: Option<&str>, index: usize, element: &JsonValue) -> ItemKey {
    key_field
        .map(|field| json_display_text(path::lookup(element, field)))
        .filter(|key| !key.is_empty())
        .map(ItemKey::Field)
        .unwrap_or(ItemKey::Position(index))
}

/// Inserts `value` at `index`, clamped to the end of the list.
pub fn insert_at(items: &[JsonValue], index: usize, value: JsonValue) -> Vec<JsonValue> {
    let mut next = items.to_vec();
    next.insert(index.min(items.len()), value);
    next
}

pub fn remove_at(items: &[JsonValue], index: usize) -> Option<Vec<JsonValue>> {
    if index >= items.len() {
        return None;
    }
    let mut next = items.to_vec();
    next.remove(index);
    Some(next)
}

/// Moves the item at `from` so it ends up at index `to`.
pub fn move_item(items: &[JsonValue], from: usize, to: usize) -> Option<Vec<JsonValue>> {
    if from >= items.len() || to >= items.len() {
        return None;
    }
    let mut next = items.to_vec();
    let item = next.remove(from);
    next.insert(to, item);
    Some(next)
}

/// List mutations of one resolved repeater.
///
/// Each operation computes the new array from the snapshot taken at resolve
/// time and emits it as a single change at the repeater's path. The entity
/// itself is never touched.
#[derive(Clone)]
pub struct RepeaterHandle {
    path: String,
    items: Vec<JsonValue>,
    new_item: JsonValue,
    sink: Arc<dyn ChangeSink>,
}

impl RepeaterHandle {
    pub fn new(
        path: impl Into<String>,
        items: Vec<JsonValue>,
        new_item: Option<JsonValue>,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        Self {
            path: path.into(),
            items,
            new_item: new_item.unwrap_or_else(|| JsonValue::Object(Default::default())),
            sink,
        }
    }

    /// A handle for `node` without a resolve pass.
    pub fn for_node(
        node: &RepeaterNode,
        entity: &JsonValue,
        context: Option<&RepeaterContext<'_>>,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<Self, RepeaterError> {
        let materialized = materialize(node, entity, context)?;
        Ok(Self::new(
            materialized.path.clone(),
            materialized.values(),
            node.new_item.clone(),
            sink,
        ))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts the repeater's new-item template at `index`.
    pub fn insert_at(&self, index: usize) {
        self.insert_value_at(index, self.new_item.clone());
    }

    pub fn insert_value_at(&self, index: usize, value: JsonValue) {
        debug!(path = %self.path, index, "Inserting repeater item");
        self.emit(insert_at(&self.items, index, value));
    }

    pub fn remove_at(&self, index: usize) -> Result<(), RepeaterError> {
        let next = remove_at(&self.items, index).ok_or_else(|| self.out_of_range(index))?;
        debug!(path = %self.path, index, "Removing repeater item");
        self.emit(next);
        Ok(())
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<(), RepeaterError> {
        let next = move_item(&self.items, from, to)
            .ok_or_else(|| self.out_of_range(if from >= self.items.len() { from } else { to }))?;
        debug!(path = %self.path, from, to, "Moving repeater item");
        self.emit(next);
        Ok(())
    }

    fn emit(&self, items: Vec<JsonValue>) {
        self.sink.on_change(&self.path, JsonValue::Array(items));
    }

    fn out_of_range(&self, index: usize) -> RepeaterError {
        RepeaterError::IndexOutOfRange {
            path: self.path.clone(),
            index,
            len: self.items.len(),
        }
    }
}

impl fmt::Debug for RepeaterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterHandle")
            .field("path", &self.path)
            .field("len", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl PartialEq for RepeaterHandle {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.items == other.items
    }
}

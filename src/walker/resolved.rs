use super::validation::ValidationIssue;
use crate::change::ChangeHandle;
use crate::definition::{FieldType, FieldValidation};
use crate::engine::ComputedValue;
use crate::repeater::{ItemKey, RepeaterHandle};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::ops::Range;

/// A node of the resolved tree: structural nodes are gone, every binding is
/// concrete and every value is current.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResolvedNode {
    Field(ResolvedField),
    Computed(ResolvedComputed),
    Container(ResolvedContainer),
    Tabs(ResolvedTabs),
    Repeater(ResolvedRepeater),
    Static(ResolvedStatic),
    Spacer(ResolvedSpacer),
    Divider(ResolvedDivider),
    Action(ResolvedAction),
    /// Stands in for a subtree that could not be resolved.
    Diagnostic(ResolvedDiagnostic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    Container,
    Group,
    Grid,
    Flex,
    Section,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedField {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub binding: String,
    pub field_type: FieldType,
    pub value: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
    /// Absent for read-only fields.
    #[serde(skip)]
    pub on_change: Option<ChangeHandle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedComputed {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub field_id: String,
    /// `None` when the definition has no such computed field.
    pub value: Option<ComputedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContainer {
    pub id: String,
    pub kind: ContainerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
    pub children: Vec<ResolvedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTabs {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
    pub tabs: Vec<ResolvedTab>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTab {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub children: Vec<ResolvedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRepeater {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
    pub binding: String,
    pub total_count: usize,
    /// Indices of the materialized items.
    pub window: Range<usize>,
    pub leading_space: f64,
    pub trailing_space: f64,
    pub items: Vec<ResolvedItem>,
    #[serde(skip)]
    pub handle: RepeaterHandle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub index: usize,
    pub key: ItemKey,
    pub children: Vec<ResolvedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStatic {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSpacer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDivider {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAction {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
    #[serde(skip)]
    pub on_trigger: Option<ChangeHandle>,
}

impl ResolvedAction {
    /// Emits the action's payload (or `null`) through its change handle.
    pub fn trigger(&self) {
        if let Some(handle) = &self.on_trigger {
            handle.emit(self.payload.clone().unwrap_or(JsonValue::Null));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDiagnostic {
    pub id: String,
    pub message: String,
}

impl ResolvedNode {
    pub fn id(&self) -> &str {
        match self {
            ResolvedNode::Field(node) => &node.id,
            ResolvedNode::Computed(node) => &node.id,
            ResolvedNode::Container(node) => &node.id,
            ResolvedNode::Tabs(node) => &node.id,
            ResolvedNode::Repeater(node) => &node.id,
            ResolvedNode::Static(node) => &node.id,
            ResolvedNode::Spacer(node) => &node.id,
            ResolvedNode::Divider(node) => &node.id,
            ResolvedNode::Action(node) => &node.id,
            ResolvedNode::Diagnostic(node) => &node.id,
        }
    }

    /// Direct children across containers, tabs and repeater items.
    pub fn children(&self) -> Vec<&ResolvedNode> {
        match self {
            ResolvedNode::Container(node) => node.children.iter().collect(),
            ResolvedNode::Tabs(node) => node.tabs.iter().flat_map(|tab| &tab.children).collect(),
            ResolvedNode::Repeater(node) => {
                node.items.iter().flat_map(|item| &item.children).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Depth-first search by id, starting with this node.
    pub fn find(&self, id: &str) -> Option<&ResolvedNode> {
        if self.id() == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(id))
    }
}

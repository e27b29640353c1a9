use super::condition::VisibilityCondition;
use crate::repeater::VirtualWindow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Properties every layout node carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<JsonValue>,
}

impl NodeMeta {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            visibility: None,
            label: None,
            style: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_visibility(mut self, condition: VisibilityCondition) -> Self {
        self.visibility = Some(condition);
        self
    }
}

/// A node of the declarative layout tree, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutNode {
    Field(FieldNode),
    Computed(ComputedNode),
    Container(ContainerNode),
    Group(ContainerNode),
    Grid(ContainerNode),
    Flex(ContainerNode),
    Section(ContainerNode),
    Tabs(TabsNode),
    Repeater(RepeaterNode),
    Conditional(ConditionalNode),
    Static(StaticNode),
    Spacer(SpacerNode),
    Divider(DividerNode),
    FragmentRef(FragmentRefNode),
    Action(ActionNode),
}

impl LayoutNode {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            LayoutNode::Field(node) => &node.meta,
            LayoutNode::Computed(node) => &node.meta,
            LayoutNode::Container(node)
            | LayoutNode::Group(node)
            | LayoutNode::Grid(node)
            | LayoutNode::Flex(node)
            | LayoutNode::Section(node) => &node.meta,
            LayoutNode::Tabs(node) => &node.meta,
            LayoutNode::Repeater(node) => &node.meta,
            LayoutNode::Conditional(node) => &node.meta,
            LayoutNode::Static(node) => &node.meta,
            LayoutNode::Spacer(node) => &node.meta,
            LayoutNode::Divider(node) => &node.meta,
            LayoutNode::FragmentRef(node) => &node.meta,
            LayoutNode::Action(node) => &node.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LayoutNode::Field(_) => "field",
            LayoutNode::Computed(_) => "computed",
            LayoutNode::Container(_) => "container",
            LayoutNode::Group(_) => "group",
            LayoutNode::Grid(_) => "grid",
            LayoutNode::Flex(_) => "flex",
            LayoutNode::Section(_) => "section",
            LayoutNode::Tabs(_) => "tabs",
            LayoutNode::Repeater(_) => "repeater",
            LayoutNode::Conditional(_) => "conditional",
            LayoutNode::Static(_) => "static",
            LayoutNode::Spacer(_) => "spacer",
            LayoutNode::Divider(_) => "divider",
            LayoutNode::FragmentRef(_) => "fragmentRef",
            LayoutNode::Action(_) => "action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Checkbox,
    Select,
    MultiSelect,
    Date,
    Color,
    Slider,
    Resource,
    #[serde(other)]
    Other,
}

/// Constraints reported on a resolved field; never enforced on the entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub binding: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(alias = "computedId")]
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Shared shape of `container`, `group`, `grid`, `flex` and `section`.
/// `options` (columns, direction, collapsible, ...) passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub tabs: Vec<TabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityCondition>,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeaterNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub binding: String,
    #[serde(default)]
    pub item_template: Vec<LayoutNode>,
    /// Item property used as the stable identity of an item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtualize: Option<VirtualWindow>,
    /// Value inserted by `insert_at`; an empty object when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_item: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub condition: VisibilityCondition,
    #[serde(rename = "then", default)]
    pub then_branch: Vec<LayoutNode>,
    #[serde(rename = "else", default)]
    pub else_branch: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacerNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividerNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
}

/// A caller-supplied fragment argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentArgument {
    Literal(JsonValue),
    Binding(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRefNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(alias = "fragmentName")]
    pub fragment: String,
    #[serde(default, alias = "parameters")]
    pub arguments: IndexMap<String, FragmentArgument>,
}

/// A button-like node. Triggering it emits `payload` through the change sink
/// at `binding`, or at `action` when no binding is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
}

use crate::definition::{
    ActionNode, ComputedNode, ConditionalNode, ContainerNode, DividerNode, FieldNode,
    FragmentArgument, FragmentRefNode, LayoutNode, NodeMeta, RepeaterNode, SpacerNode,
    StaticNode, TabEntry, TabsNode, VisibilityCondition,
};
use crate::path::Template;
use ahash::AHashMap;
use serde_json::Value as JsonValue;

/// Parameter values bound for one expansion.
///
/// Each parameter has two renderings: the text written into binding
/// positions (field bindings, condition fields, repeater bindings) and the
/// text written into display positions (labels, static content, literal
/// condition values). They differ for binding-kind parameters, which put the
/// caller's path into bindings and its current value into display text.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    binding: AHashMap<String, String>,
    display: AHashMap<String, String>,
}

impl Substitutions {
    pub fn bind(&mut self, name: &str, binding_text: String, display_text: String) {
        self.binding.insert(name.to_string(), binding_text);
        self.display.insert(name.to_string(), display_text);
    }

    fn binding_text(&self, source: &str) -> String {
        Template::parse(source)
            .substitute(|name| self.binding.get(name).cloned())
            .to_string()
    }

    fn display_text(&self, source: &str) -> String {
        Template::parse(source)
            .substitute(|name| self.display.get(name).cloned())
            .to_string()
    }
}

/// Deep-copies `nodes` with parameters substituted and every id prefixed by
/// `prefix/`, so expanded ids stay unique per reference site.
pub fn substitute_nodes(nodes: &[LayoutNode], subs: &Substitutions, prefix: &str) -> Vec<LayoutNode> {
    nodes
        .iter()
        .map(|node| substitute_node(node, subs, prefix))
        .collect()
}

fn substitute_node(node: &LayoutNode, subs: &Substitutions, prefix: &str) -> LayoutNode {
    match node {
        LayoutNode::Field(field) => LayoutNode::Field(FieldNode {
            meta: substitute_meta(&field.meta, subs, prefix),
            binding: subs.binding_text(&field.binding),
            default_value: field.default_value.as_ref().map(|v| substitute_json(v, subs)),
            ..field.clone()
        }),
        LayoutNode::Computed(computed) => LayoutNode::Computed(ComputedNode {
            meta: substitute_meta(&computed.meta, subs, prefix),
            field_id: subs.binding_text(&computed.field_id),
            format: computed.format.clone(),
        }),
        LayoutNode::Container(c) => LayoutNode::Container(substitute_container(c, subs, prefix)),
        LayoutNode::Group(c) => LayoutNode::Group(substitute_container(c, subs, prefix)),
        LayoutNode::Grid(c) => LayoutNode::Grid(substitute_container(c, subs, prefix)),
        LayoutNode::Flex(c) => LayoutNode::Flex(substitute_container(c, subs, prefix)),
        LayoutNode::Section(c) => LayoutNode::Section(substitute_container(c, subs, prefix)),
        LayoutNode::Tabs(tabs) => LayoutNode::Tabs(TabsNode {
            meta: substitute_meta(&tabs.meta, subs, prefix),
            tabs: tabs
                .tabs
                .iter()
                .map(|tab| TabEntry {
                    id: format!("{}/{}", prefix, tab.id),
                    label: tab.label.as_ref().map(|label| subs.display_text(label)),
                    visibility: tab
                        .visibility
                        .as_ref()
                        .map(|condition| substitute_condition(condition, subs)),
                    children: substitute_nodes(&tab.children, subs, prefix),
                })
                .collect(),
        }),
        LayoutNode::Repeater(repeater) => LayoutNode::Repeater(RepeaterNode {
            meta: substitute_meta(&repeater.meta, subs, prefix),
            binding: subs.binding_text(&repeater.binding),
            item_template: substitute_nodes(&repeater.item_template, subs, prefix),
            ..repeater.clone()
        }),
        LayoutNode::Conditional(conditional) => LayoutNode::Conditional(ConditionalNode {
            meta: substitute_meta(&conditional.meta, subs, prefix),
            condition: substitute_condition(&conditional.condition, subs),
            then_branch: substitute_nodes(&conditional.then_branch, subs, prefix),
            else_branch: substitute_nodes(&conditional.else_branch, subs, prefix),
        }),
        LayoutNode::Static(static_node) => LayoutNode::Static(StaticNode {
            meta: substitute_meta(&static_node.meta, subs, prefix),
            content: subs.display_text(&static_node.content),
            ..static_node.clone()
        }),
        LayoutNode::Spacer(spacer) => LayoutNode::Spacer(SpacerNode {
            meta: substitute_meta(&spacer.meta, subs, prefix),
            size: spacer.size,
        }),
        LayoutNode::Divider(divider) => LayoutNode::Divider(DividerNode {
            meta: substitute_meta(&divider.meta, subs, prefix),
        }),
        LayoutNode::FragmentRef(reference) => LayoutNode::FragmentRef(FragmentRefNode {
            meta: substitute_meta(&reference.meta, subs, prefix),
            fragment: reference.fragment.clone(),
            arguments: reference
                .arguments
                .iter()
                .map(|(name, argument)| {
                    let argument = match argument {
                        FragmentArgument::Literal(value) => {
                            FragmentArgument::Literal(substitute_json(value, subs))
                        }
                        FragmentArgument::Binding(path) => {
                            FragmentArgument::Binding(subs.binding_text(path))
                        }
                    };
                    (name.clone(), argument)
                })
                .collect(),
        }),
        LayoutNode::Action(action) => LayoutNode::Action(ActionNode {
            meta: substitute_meta(&action.meta, subs, prefix),
            binding: action.binding.as_ref().map(|binding| subs.binding_text(binding)),
            payload: action.payload.as_ref().map(|payload| substitute_json(payload, subs)),
            ..action.clone()
        }),
    }
}

fn substitute_meta(meta: &NodeMeta, subs: &Substitutions, prefix: &str) -> NodeMeta {
    NodeMeta {
        id: format!("{}/{}", prefix, meta.id),
        visibility: meta
            .visibility
            .as_ref()
            .map(|condition| substitute_condition(condition, subs)),
        label: meta.label.as_ref().map(|label| subs.display_text(label)),
        style: meta.style.clone(),
    }
}

fn substitute_container(node: &ContainerNode, subs: &Substitutions, prefix: &str) -> ContainerNode {
    ContainerNode {
        meta: substitute_meta(&node.meta, subs, prefix),
        children: substitute_nodes(&node.children, subs, prefix),
        options: node.options.clone(),
    }
}

fn substitute_condition(condition: &VisibilityCondition, subs: &Substitutions) -> VisibilityCondition {
    match condition {
        VisibilityCondition::Compound { op, conditions } => VisibilityCondition::Compound {
            op: op.clone(),
            conditions: conditions
                .iter()
                .map(|condition| substitute_condition(condition, subs))
                .collect(),
        },
        VisibilityCondition::Simple {
            field,
            operator,
            value,
        } => VisibilityCondition::Simple {
            field: subs.binding_text(field),
            operator: operator.clone(),
            value: value.as_ref().map(|value| substitute_json(value, subs)),
        },
    }
}

/// Substitutes display text inside string values only.
fn substitute_json(value: &JsonValue, subs: &Substitutions) -> JsonValue {
    match value {
        JsonValue::String(text) => JsonValue::String(subs.display_text(text)),
        other => other.clone(),
    }
}

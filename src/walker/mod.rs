//! The layout walker: definition + entity + computed values -> resolved tree.
//!
//! The walk is depth-first in document order. Invisible nodes are dropped
//! with their subtrees. `conditional` and `fragmentRef` nodes never appear in
//! the output: their chosen children are spliced into the parent. Anything
//! that goes wrong below the node level becomes a diagnostic and, where a
//! subtree is lost, a `Diagnostic` placeholder node.

pub mod resolved;
pub mod validation;

pub use resolved::{
    ContainerKind, ResolvedAction, ResolvedComputed, ResolvedContainer, ResolvedDiagnostic,
    ResolvedDivider, ResolvedField, ResolvedItem, ResolvedNode, ResolvedRepeater, ResolvedSpacer,
    ResolvedStatic, ResolvedTab, ResolvedTabs,
};
pub use validation::{ValidationIssue, validate};

use crate::change::{ChangeHandle, ChangeSink};
use crate::condition::ConditionEvaluator;
use crate::definition::{
    ActionNode, ComputedNode, ConditionalNode, ContainerNode, FieldNode, FormFragment,
    FragmentRefNode, LayoutNode, NodeMeta, RepeaterNode, StaticNode, TabsNode,
    VisibilityCondition,
};
use crate::diagnostics::Diagnostic;
use crate::engine::ComputedValues;
use crate::error::PathError;
use crate::formula::COMPUTED_ROOT;
use crate::fragment;
use crate::path::{self, INDEX_PLACEHOLDER, RepeaterContext, Template, TemplatePart};
use crate::repeater::{self, RepeaterHandle};
use crate::value::json_display_text;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

/// Interpolation root for the innermost repeater item: `{{item.name}}`.
pub const ITEM_PLACEHOLDER: &str = "item";

/// Scroll state of one virtualized repeater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_offset: f64,
    pub viewport_size: f64,
}

impl Viewport {
    pub fn new(scroll_offset: f64, viewport_size: f64) -> Self {
        Self {
            scroll_offset,
            viewport_size,
        }
    }
}

/// Per-pass options. Repeaters without a viewport materialize every item.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    viewports: AHashMap<String, Viewport>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(mut self, repeater_id: &str, viewport: Viewport) -> Self {
        self.viewports.insert(repeater_id.to_string(), viewport);
        self
    }

    pub fn viewport(&self, repeater_id: &str) -> Option<Viewport> {
        self.viewports.get(repeater_id).copied()
    }
}

/// The output of one resolve pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Resolution {
    pub nodes: Vec<ResolvedNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Depth-first search by id over the whole tree.
    pub fn find(&self, id: &str) -> Option<&ResolvedNode> {
        self.nodes.iter().find_map(|node| node.find(id))
    }
}

/// Resolves `nodes` in one pass.
pub fn resolve(
    nodes: &[LayoutNode],
    entity: &JsonValue,
    fragments: &IndexMap<String, FormFragment>,
    computed: &ComputedValues,
    context: Option<&RepeaterContext<'_>>,
    options: &ResolveOptions,
    sink: Arc<dyn ChangeSink>,
) -> Resolution {
    LayoutWalker::new(entity, fragments, computed, options, sink).resolve(nodes, context)
}

/// State of one resolve pass.
pub struct LayoutWalker<'a> {
    entity: &'a JsonValue,
    fragments: &'a IndexMap<String, FormFragment>,
    computed: &'a ComputedValues,
    options: &'a ResolveOptions,
    sink: Arc<dyn ChangeSink>,
    /// Fragment names being expanded, outermost first.
    fragment_chain: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> LayoutWalker<'a> {
    pub fn new(
        entity: &'a JsonValue,
        fragments: &'a IndexMap<String, FormFragment>,
        computed: &'a ComputedValues,
        options: &'a ResolveOptions,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        Self {
            entity,
            fragments,
            computed,
            options,
            sink,
            fragment_chain: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn resolve(mut self, nodes: &[LayoutNode], context: Option<&RepeaterContext<'_>>) -> Resolution {
        let mut out = Vec::new();
        self.resolve_nodes(nodes, context, &mut out);
        debug!(
            nodes = out.len(),
            diagnostics = self.diagnostics.len(),
            "Resolved layout"
        );
        Resolution {
            nodes: out,
            diagnostics: self.diagnostics,
        }
    }

    fn resolve_nodes(
        &mut self,
        nodes: &[LayoutNode],
        context: Option<&RepeaterContext<'_>>,
        out: &mut Vec<ResolvedNode>,
    ) {
        for node in nodes {
            self.resolve_node(node, context, out);
        }
    }

    fn resolve_node(
        &mut self,
        node: &LayoutNode,
        context: Option<&RepeaterContext<'_>>,
        out: &mut Vec<ResolvedNode>,
    ) {
        let meta = node.meta();
        if !self.is_visible(&meta.id, meta.visibility.as_ref(), context) {
            return;
        }

        match node {
            LayoutNode::Field(field) => out.push(self.resolve_field(field, context)),
            LayoutNode::Computed(computed) => out.push(self.resolve_computed(computed, context)),
            LayoutNode::Container(c) => {
                out.push(self.resolve_container(c, ContainerKind::Container, context))
            }
            LayoutNode::Group(c) => out.push(self.resolve_container(c, ContainerKind::Group, context)),
            LayoutNode::Grid(c) => out.push(self.resolve_container(c, ContainerKind::Grid, context)),
            LayoutNode::Flex(c) => out.push(self.resolve_container(c, ContainerKind::Flex, context)),
            LayoutNode::Section(c) => {
                out.push(self.resolve_container(c, ContainerKind::Section, context))
            }
            LayoutNode::Tabs(tabs) => out.push(self.resolve_tabs(tabs, context)),
            LayoutNode::Repeater(repeater) => out.push(self.resolve_repeater(repeater, context)),
            LayoutNode::Conditional(conditional) => {
                self.resolve_conditional(conditional, context, out)
            }
            LayoutNode::FragmentRef(reference) => self.resolve_fragment_ref(reference, context, out),
            LayoutNode::Static(static_node) => out.push(self.resolve_static(static_node, context)),
            LayoutNode::Spacer(spacer) => out.push(ResolvedNode::Spacer(ResolvedSpacer {
                id: spacer.meta.id.clone(),
                size: spacer.size,
                style: spacer.meta.style.clone(),
            })),
            LayoutNode::Divider(divider) => out.push(ResolvedNode::Divider(ResolvedDivider {
                id: divider.meta.id.clone(),
                style: divider.meta.style.clone(),
            })),
            LayoutNode::Action(action) => out.push(self.resolve_action(action, context)),
        }
    }

    fn is_visible(
        &mut self,
        node_id: &str,
        visibility: Option<&VisibilityCondition>,
        context: Option<&RepeaterContext<'_>>,
    ) -> bool {
        match visibility {
            None => true,
            Some(condition) => ConditionEvaluator::new(self.entity, context).evaluate_reporting(
                node_id,
                condition,
                &mut self.diagnostics,
            ),
        }
    }

    fn resolve_field(&mut self, node: &FieldNode, context: Option<&RepeaterContext<'_>>) -> ResolvedNode {
        let binding = match path::concretize(&node.binding, context) {
            Ok(binding) => binding,
            Err(e) => return self.diagnostic_node(&node.meta.id, e),
        };
        let value = path::lookup(self.entity, &binding)
            .cloned()
            .or_else(|| node.default_value.clone());
        let issues = node
            .validation
            .as_ref()
            .map(|rules| validate(value.as_ref(), rules))
            .unwrap_or_default();
        let on_change = (!node.read_only).then(|| ChangeHandle::new(binding.clone(), self.sink.clone()));

        ResolvedNode::Field(ResolvedField {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            binding,
            field_type: node.field_type,
            value,
            options: node.options.clone(),
            read_only: node.read_only,
            validation: node.validation.clone(),
            issues,
            style: node.meta.style.clone(),
            on_change,
        })
    }

    fn resolve_computed(
        &mut self,
        node: &ComputedNode,
        context: Option<&RepeaterContext<'_>>,
    ) -> ResolvedNode {
        let value = self.computed.get(&node.field_id).cloned();
        if value.is_none() {
            warn!(node_id = %node.meta.id, field_id = %node.field_id, "Unknown computed field");
            self.diagnostics.push(Diagnostic::UnknownComputedField {
                node_id: node.meta.id.clone(),
                field_id: node.field_id.clone(),
            });
        }
        ResolvedNode::Computed(ResolvedComputed {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            field_id: node.field_id.clone(),
            value,
            format: node.format.clone(),
            style: node.meta.style.clone(),
        })
    }

    fn resolve_container(
        &mut self,
        node: &ContainerNode,
        kind: ContainerKind,
        context: Option<&RepeaterContext<'_>>,
    ) -> ResolvedNode {
        let mut children = Vec::new();
        self.resolve_nodes(&node.children, context, &mut children);
        ResolvedNode::Container(ResolvedContainer {
            id: node.meta.id.clone(),
            kind,
            label: self.label(&node.meta, context),
            options: node.options.clone(),
            style: node.meta.style.clone(),
            children,
        })
    }

    fn resolve_tabs(&mut self, node: &TabsNode, context: Option<&RepeaterContext<'_>>) -> ResolvedNode {
        let mut tabs = Vec::new();
        for tab in &node.tabs {
            if !self.is_visible(&tab.id, tab.visibility.as_ref(), context) {
                continue;
            }
            let mut children = Vec::new();
            self.resolve_nodes(&tab.children, context, &mut children);
            tabs.push(ResolvedTab {
                id: tab.id.clone(),
                label: tab
                    .label
                    .as_ref()
                    .map(|label| self.interpolate(&tab.id, label, context)),
                children,
            });
        }
        ResolvedNode::Tabs(ResolvedTabs {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            style: node.meta.style.clone(),
            tabs,
        })
    }

    fn resolve_repeater(
        &mut self,
        node: &RepeaterNode,
        context: Option<&RepeaterContext<'_>>,
    ) -> ResolvedNode {
        let entity = self.entity;
        let materialized = match repeater::materialize(node, entity, context) {
            Ok(materialized) => materialized,
            Err(e) => return self.diagnostic_node(&node.meta.id, e),
        };

        let total_count = materialized.items.len();
        let (window, leading_space, trailing_space) =
            match (node.virtualize, self.options.viewport(&node.meta.id)) {
                (Some(virtual_window), Some(viewport)) => {
                    let window = virtual_window.visible_window(
                        total_count,
                        viewport.scroll_offset,
                        viewport.viewport_size,
                    );
                    let leading = virtual_window.leading_space(&window);
                    let trailing = virtual_window.trailing_space(&window, total_count);
                    (window, leading, trailing)
                }
                _ => (0..total_count, 0.0, 0.0),
            };

        let mut items = Vec::with_capacity(window.len());
        for item in &materialized.items[window.clone()] {
            let mut children = Vec::new();
            self.resolve_nodes(&node.item_template, Some(&item.context), &mut children);
            items.push(ResolvedItem {
                index: item.index,
                key: item.key.clone(),
                children,
            });
        }

        let handle = RepeaterHandle::new(
            materialized.path.clone(),
            materialized.values(),
            node.new_item.clone(),
            self.sink.clone(),
        );

        ResolvedNode::Repeater(ResolvedRepeater {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            style: node.meta.style.clone(),
            binding: materialized.path,
            total_count,
            window,
            leading_space,
            trailing_space,
            items,
            handle,
        })
    }

    fn resolve_conditional(
        &mut self,
        node: &ConditionalNode,
        context: Option<&RepeaterContext<'_>>,
        out: &mut Vec<ResolvedNode>,
    ) {
        let holds = ConditionEvaluator::new(self.entity, context).evaluate_reporting(
            &node.meta.id,
            &node.condition,
            &mut self.diagnostics,
        );
        let branch = if holds {
            &node.then_branch
        } else {
            &node.else_branch
        };
        self.resolve_nodes(branch, context, out);
    }

    fn resolve_fragment_ref(
        &mut self,
        node: &FragmentRefNode,
        context: Option<&RepeaterContext<'_>>,
        out: &mut Vec<ResolvedNode>,
    ) {
        match fragment::expand(node, self.fragments, self.entity, context, &self.fragment_chain) {
            Ok(expansion) => {
                self.diagnostics.extend(expansion.diagnostics);
                self.fragment_chain.push(node.fragment.clone());
                self.resolve_nodes(&expansion.nodes, context, out);
                self.fragment_chain.pop();
            }
            Err(e) => {
                warn!(node_id = %node.meta.id, error = %e, "Fragment could not be expanded");
                out.push(ResolvedNode::Diagnostic(ResolvedDiagnostic {
                    id: node.meta.id.clone(),
                    message: e.to_string(),
                }));
                self.diagnostics.push(Diagnostic::from(e));
            }
        }
    }

    fn resolve_static(&mut self, node: &StaticNode, context: Option<&RepeaterContext<'_>>) -> ResolvedNode {
        ResolvedNode::Static(ResolvedStatic {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            content: self.interpolate(&node.meta.id, &node.content, context),
            format: node.format.clone(),
            options: node.options.clone(),
            style: node.meta.style.clone(),
        })
    }

    fn resolve_action(&mut self, node: &ActionNode, context: Option<&RepeaterContext<'_>>) -> ResolvedNode {
        let target = node.binding.as_deref().unwrap_or(&node.action);
        let on_trigger = match path::concretize(target, context) {
            Ok(target) => Some(ChangeHandle::new(target, self.sink.clone())),
            Err(e) => {
                warn!(node_id = %node.meta.id, error = %e, "Action target could not be resolved");
                self.diagnostics.push(Diagnostic::path(&node.meta.id, e));
                None
            }
        };
        ResolvedNode::Action(ResolvedAction {
            id: node.meta.id.clone(),
            label: self.label(&node.meta, context),
            action: node.action.clone(),
            payload: node.payload.clone(),
            style: node.meta.style.clone(),
            on_trigger,
        })
    }

    fn label(&mut self, meta: &NodeMeta, context: Option<&RepeaterContext<'_>>) -> Option<String> {
        meta.label
            .as_ref()
            .map(|label| self.interpolate(&meta.id, label, context))
    }

    /// Renders `{{index}}`, `{{item.x}}`, `{{computed.id}}` and entity paths
    /// inside display text. Unresolvable placeholders render empty.
    fn interpolate(&mut self, node_id: &str, text: &str, context: Option<&RepeaterContext<'_>>) -> String {
        let template = Template::parse(text);
        let mut out = String::with_capacity(text.len());
        for part in template.parts() {
            match part {
                TemplatePart::Literal(literal) => out.push_str(literal),
                TemplatePart::Placeholder(name) => {
                    out.push_str(&self.placeholder_text(node_id, name, context))
                }
            }
        }
        out
    }

    fn placeholder_text(
        &mut self,
        node_id: &str,
        name: &str,
        context: Option<&RepeaterContext<'_>>,
    ) -> String {
        if name == INDEX_PLACEHOLDER {
            return match context {
                Some(context) => context.index.to_string(),
                None => {
                    self.diagnostics.push(Diagnostic::path(
                        node_id,
                        PathError::MissingRepeaterContext {
                            path: text_placeholder(name),
                        },
                    ));
                    String::new()
                }
            };
        }

        if let Some(rest) = strip_root(name, COMPUTED_ROOT) {
            let (field_id, member) = rest.split_once('.').unwrap_or((rest, ""));
            return json_display_text(
                self.computed
                    .value(field_id)
                    .and_then(|value| path::lookup(value, member)),
            );
        }

        if let (Some(rest), Some(context)) = (strip_root(name, ITEM_PLACEHOLDER), context) {
            return json_display_text(path::lookup(context.item, rest));
        }

        match path::resolve(self.entity, name, context) {
            Ok(value) => json_display_text(value),
            Err(e) => {
                self.diagnostics.push(Diagnostic::path(node_id, e));
                String::new()
            }
        }
    }

    fn diagnostic_node(&mut self, node_id: &str, error: impl ToString) -> ResolvedNode {
        let message = error.to_string();
        warn!(node_id, error = %message, "Node could not be resolved");
        self.diagnostics.push(Diagnostic::Path {
            node_id: node_id.to_string(),
            message: message.clone(),
        });
        ResolvedNode::Diagnostic(ResolvedDiagnostic {
            id: node_id.to_string(),
            message,
        })
    }
}

/// `computed.str` -> Some("str"); `computed` -> Some(""); `computedX` -> None.
fn strip_root<'n>(name: &'n str, root: &str) -> Option<&'n str> {
    match name.strip_prefix(root)? {
        "" => Some(""),
        rest => rest.strip_prefix('.'),
    }
}

fn text_placeholder(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

//! Expansion of `fragmentRef` nodes into concrete layout subtrees.

pub mod substitute;

pub use substitute::Substitutions;

use crate::definition::{
    FormFragment, FragmentArgument, FragmentParameter, FragmentRefNode, LayoutNode, ParameterKind,
};
use crate::diagnostics::Diagnostic;
use crate::error::FragmentError;
use crate::path::{self, RepeaterContext};
use crate::value::json_display_text;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// The substituted subtree of one reference, plus what went wrong while
/// binding its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub nodes: Vec<LayoutNode>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Expands `reference` against the fragment table.
///
/// `chain` holds the fragment names currently being expanded, outermost
/// first; a reference to any of them is a cycle. Binding arguments are
/// resolved now, under `context`, so a fragment used inside a repeater binds
/// to the current item.
pub fn expand(
    reference: &FragmentRefNode,
    fragments: &IndexMap<String, FormFragment>,
    entity: &JsonValue,
    context: Option<&RepeaterContext<'_>>,
    chain: &[String],
) -> Result<Expansion, FragmentError> {
    let node_id = &reference.meta.id;
    let fragment = fragments
        .get(&reference.fragment)
        .ok_or_else(|| FragmentError::Missing {
            node_id: node_id.clone(),
            name: reference.fragment.clone(),
        })?;

    if chain.contains(&reference.fragment) {
        let mut chain = chain.to_vec();
        chain.push(reference.fragment.clone());
        return Err(FragmentError::Cycle {
            node_id: node_id.clone(),
            name: reference.fragment.clone(),
            chain,
        });
    }

    let mut diagnostics = Vec::new();
    let subs = bind_arguments(reference, fragment, entity, context, &mut diagnostics);
    debug!(node_id = %node_id, fragment = %fragment.name, "Expanding fragment");

    Ok(Expansion {
        nodes: substitute::substitute_nodes(&fragment.layout, &subs, node_id),
        diagnostics,
    })
}

fn bind_arguments(
    reference: &FragmentRefNode,
    fragment: &FormFragment,
    entity: &JsonValue,
    context: Option<&RepeaterContext<'_>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Substitutions {
    let node_id = &reference.meta.id;
    let mut subs = Substitutions::default();

    for parameter in &fragment.parameters {
        match reference.arguments.get(&parameter.name) {
            Some(argument) => {
                let (binding, display) =
                    render_argument(parameter.kind, argument, entity, context, node_id, diagnostics);
                subs.bind(&parameter.name, binding, display);
            }
            None => match default_argument(parameter) {
                Some(argument) => {
                    let (binding, display) = render_argument(
                        parameter.kind,
                        &argument,
                        entity,
                        context,
                        node_id,
                        diagnostics,
                    );
                    subs.bind(&parameter.name, binding, display);
                }
                None => {
                    missing_argument(parameter, reference, fragment, diagnostics);
                    subs.bind(&parameter.name, String::new(), String::new());
                }
            },
        }
    }

    // Arguments the fragment does not declare are still usable, as their own kind.
    for (name, argument) in &reference.arguments {
        if fragment.parameters.iter().any(|p| &p.name == name) {
            continue;
        }
        let kind = match argument {
            FragmentArgument::Literal(_) => ParameterKind::Literal,
            FragmentArgument::Binding(_) => ParameterKind::Binding,
        };
        let (binding, display) =
            render_argument(kind, argument, entity, context, node_id, diagnostics);
        subs.bind(name, binding, display);
    }

    subs
}

/// Returns (binding-position text, display-position text).
fn render_argument(
    kind: ParameterKind,
    argument: &FragmentArgument,
    entity: &JsonValue,
    context: Option<&RepeaterContext<'_>>,
    node_id: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> (String, String) {
    match argument {
        FragmentArgument::Literal(value) => {
            let text = json_display_text(Some(value));
            (text.clone(), text)
        }
        FragmentArgument::Binding(binding) => {
            let concrete = match path::concretize(binding, context) {
                Ok(concrete) => concrete,
                Err(e) => {
                    warn!(node_id, error = %e, "Fragment argument path could not be resolved");
                    diagnostics.push(Diagnostic::path(node_id, e));
                    return (String::new(), String::new());
                }
            };
            let display = json_display_text(path::lookup(entity, &concrete));
            match kind {
                ParameterKind::Binding => (concrete, display),
                ParameterKind::Literal => (display.clone(), display),
            }
        }
    }
}

/// A declared default acts like a caller argument of the parameter's kind.
fn default_argument(parameter: &FragmentParameter) -> Option<FragmentArgument> {
    match (&parameter.default, parameter.kind) {
        (Some(JsonValue::String(binding)), ParameterKind::Binding) => {
            Some(FragmentArgument::Binding(binding.clone()))
        }
        (Some(value), _) => Some(FragmentArgument::Literal(value.clone())),
        (None, _) => None,
    }
}

fn missing_argument(
    parameter: &FragmentParameter,
    reference: &FragmentRefNode,
    fragment: &FormFragment,
    diagnostics: &mut Vec<Diagnostic>,
) {
    warn!(
        node_id = %reference.meta.id,
        fragment = %fragment.name,
        parameter = %parameter.name,
        "Fragment argument missing, substituting empty text"
    );
    diagnostics.push(Diagnostic::MissingFragmentArgument {
        node_id: reference.meta.id.clone(),
        fragment: fragment.name.clone(),
        parameter: parameter.name.clone(),
    });
}

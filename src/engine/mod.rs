//! The per-definition engine: parsed formulas, the dependency schedule and
//! the entry points hosts call on every entity change.

pub mod computed;

pub use computed::{ComputedValue, ComputedValues};

use crate::change::ChangeSink;
use crate::definition::{FormDefinition, FormIdentity};
use crate::diagnostics::Diagnostic;
use crate::formula::{CompiledFormula, FormulaFunction, FormulaScope, FunctionRegistry};
use crate::path;
use crate::schedule::DependencyGraph;
use crate::walker::{self, ResolveOptions, Resolution};
use ahash::AHashMap;
use indexmap::IndexMap;
use itertools::Itertools;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const CYCLE_MESSAGE: &str = "field is part of a dependency cycle";

/// A builder for configuring and creating a `FormEngine`.
pub struct FormEngineBuilder {
    definition: FormDefinition,
    functions: FunctionRegistry,
}

impl FormEngineBuilder {
    pub fn new(definition: FormDefinition) -> Self {
        Self {
            definition,
            functions: FunctionRegistry::with_builtins(),
        }
    }

    /// Makes a function available to every formula of the form.
    pub fn with_function(mut self, function: Box<dyn FormulaFunction>) -> Self {
        self.functions.register(function);
        self
    }

    /// Maps a custom name onto a built-in, e.g. `modifier` -> `floor`.
    pub fn with_function_alias(mut self, alias: &str, builtin: &str) -> Self {
        if !self.functions.alias(alias, builtin) {
            warn!(alias, builtin, "Alias target is not a built-in function, ignoring");
        }
        self
    }

    /// Parses every formula and schedules the computed fields.
    pub fn build(self) -> FormEngine {
        let definition = self.definition;
        let mut load_diagnostics = Vec::new();
        let mut formulas = AHashMap::new();
        let mut effective = IndexMap::new();

        for (id, field) in &definition.computed_fields {
            let formula = CompiledFormula::compile(&field.formula);
            if let Err(e) = formula.expression() {
                warn!(field_id = %id, error = %e, "Formula does not parse");
                load_diagnostics.push(Diagnostic::FormulaSyntax {
                    field_id: id.clone(),
                    message: e.to_string(),
                });
            }

            let derived = formula.dependencies();
            for read in &derived {
                let declared = field
                    .dependencies
                    .iter()
                    .any(|dep| path::is_prefix(path::static_prefix(dep), read));
                if !declared {
                    warn!(field_id = %id, path = %read, "Formula reads an undeclared dependency");
                    load_diagnostics.push(Diagnostic::UndeclaredDependency {
                        field_id: id.clone(),
                        path: read.clone(),
                    });
                }
            }

            let deps: Vec<String> = field
                .dependencies
                .iter()
                .map(|dep| path::static_prefix(dep).to_string())
                .chain(derived)
                .unique()
                .collect();
            effective.insert(id.clone(), deps);
            formulas.insert(id.clone(), formula);
        }

        let graph = DependencyGraph::build(effective);
        for cycle in graph.cycles() {
            warn!(cycle = %cycle.join(" → "), "Computed fields form a dependency cycle");
            load_diagnostics.push(Diagnostic::DependencyCycle {
                cycle: cycle.clone(),
            });
        }

        debug!(
            game_system = %definition.game_system_id,
            entity_type = %definition.entity_type,
            version = definition.version,
            computed_fields = formulas.len(),
            "Built form engine"
        );

        FormEngine {
            definition,
            formulas,
            graph,
            functions: self.functions,
            load_diagnostics,
        }
    }
}

/// The engine for one form definition. Immutable once built, so one
/// instance can serve every entity of that type across threads.
#[derive(Debug)]
pub struct FormEngine {
    definition: FormDefinition,
    formulas: AHashMap<String, CompiledFormula>,
    graph: DependencyGraph,
    functions: FunctionRegistry,
    load_diagnostics: Vec<Diagnostic>,
}

impl FormEngine {
    pub fn builder(definition: FormDefinition) -> FormEngineBuilder {
        FormEngineBuilder::new(definition)
    }

    pub fn new(definition: FormDefinition) -> Self {
        Self::builder(definition).build()
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn identity(&self) -> FormIdentity {
        self.definition.identity()
    }

    /// Whether this engine may be reused for `definition`.
    pub fn is_current_for(&self, definition: &FormDefinition) -> bool {
        self.identity() == definition.identity()
    }

    /// Problems found while building: bad formulas, cycles, undeclared reads.
    pub fn load_diagnostics(&self) -> &[Diagnostic] {
        &self.load_diagnostics
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn affected_by(&self, changed_path: &str) -> Vec<String> {
        self.graph.affected_by(changed_path)
    }

    /// Evaluates every computed field in dependency order.
    #[instrument(level = "debug", skip_all, fields(fields = self.graph.len()))]
    pub fn compute_all(&self, entity: &JsonValue) -> ComputedValues {
        let mut values = ComputedValues::new();
        self.fail_cyclic_fields(&mut values);
        for id in self.graph.evaluation_order() {
            let value = self.evaluate_field(id, entity, &values);
            values.insert(id, value);
        }
        values
    }

    /// Re-evaluates only the fields affected by a change at `changed_path`,
    /// keeping every other value from `previous`.
    #[instrument(level = "debug", skip(self, entity, previous))]
    pub fn recompute(
        &self,
        entity: &JsonValue,
        changed_path: &str,
        previous: &ComputedValues,
    ) -> ComputedValues {
        let mut values = previous.clone();
        self.fail_cyclic_fields(&mut values);
        let affected = self.affected_by(changed_path);
        debug!(affected = affected.len(), "Recomputing affected fields");
        for id in &affected {
            let value = self.evaluate_field(id, entity, &values);
            values.insert(id.as_str(), value);
        }
        values
    }

    /// Marks every cyclic field failed, so downstream reads see `UpstreamFailed`.
    fn fail_cyclic_fields(&self, values: &mut ComputedValues) {
        for id in self.graph.cyclic_fields() {
            values.insert(id, ComputedValue::failed(id, CYCLE_MESSAGE));
        }
    }

    /// Evaluates one field against already computed upstream values.
    pub fn evaluate_field(
        &self,
        field_id: &str,
        entity: &JsonValue,
        computed: &ComputedValues,
    ) -> ComputedValue {
        let (Some(field), Some(formula)) = (
            self.definition.computed_fields.get(field_id),
            self.formulas.get(field_id),
        ) else {
            return ComputedValue::failed(field_id, "no such computed field");
        };
        if self.graph.is_cyclic(field_id) {
            return ComputedValue::failed(field_id, CYCLE_MESSAGE);
        }

        let scope = FormulaScope::new(entity, &self.functions).with_computed(computed);
        match formula
            .evaluate(scope)
            .and_then(|value| field.result_type.coerce(value))
        {
            Ok(value) => ComputedValue::Value(value),
            Err(e) => {
                warn!(field_id, error = %e, "Computed field evaluation failed");
                ComputedValue::failed(field_id, e.to_string())
            }
        }
    }

    /// Computes every field, then resolves the layout with no virtualized
    /// viewports.
    pub fn resolve(&self, entity: &JsonValue, sink: Arc<dyn ChangeSink>) -> Resolution {
        let computed = self.compute_all(entity);
        self.resolve_with(entity, &computed, &ResolveOptions::default(), sink)
    }

    /// Resolves the layout against precomputed values. Failed computed
    /// fields are reported in the resolution's diagnostics.
    pub fn resolve_with(
        &self,
        entity: &JsonValue,
        computed: &ComputedValues,
        options: &ResolveOptions,
        sink: Arc<dyn ChangeSink>,
    ) -> Resolution {
        let mut resolution = walker::resolve(
            &self.definition.layout,
            entity,
            &self.definition.fragments,
            computed,
            None,
            options,
            sink,
        );
        let mut diagnostics: Vec<Diagnostic> =
            computed.failures().cloned().map(Diagnostic::from).collect();
        diagnostics.append(&mut resolution.diagnostics);
        resolution.diagnostics = diagnostics;
        resolution
    }
}

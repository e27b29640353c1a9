//! Dependency ordering of computed fields.
//!
//! A computed field B depends on A when one of B's dependency paths overlaps
//! `computed.A`. Fields are evaluated in topological order with ties broken
//! by declaration order. Fields on a cycle are never evaluated; fields
//! downstream of a cycle still are, and see the cyclic field as failed.

use crate::formula::COMPUTED_ROOT;
use crate::path::{self, PathSegment};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::mem;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Effective dependency paths per field, in declaration order.
    fields: IndexMap<String, Vec<String>>,
    /// `dependents[a]` holds every field that reads field `a`.
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
    cyclic: Vec<bool>,
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn build(fields: IndexMap<String, Vec<String>>) -> Self {
        let n = fields.len();
        let mut dependents = vec![Vec::new(); n];
        let mut upstream = vec![Vec::new(); n];
        for (downstream, deps) in fields.values().enumerate() {
            for (up, up_id) in fields.keys().enumerate() {
                if reads_computed(deps, up_id, up == downstream) {
                    dependents[up].push(downstream);
                    upstream[downstream].push(up);
                }
            }
        }

        let cyclic: Vec<bool> = (0..n).map(|i| reaches(&dependents, i, i)).collect();

        // Kahn's algorithm over the acyclic part; a BTreeSet keeps ties in
        // declaration order.
        let mut in_degree: Vec<usize> = upstream
            .iter()
            .map(|ups| ups.iter().filter(|&&up| !cyclic[up]).count())
            .collect();
        let mut ready: BTreeSet<usize> = (0..n)
            .filter(|&i| !cyclic[i] && in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &dependents[node] {
                if cyclic[dependent] {
                    continue;
                }
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        let mut reported = vec![false; n];
        let mut cycles = Vec::new();
        for start in 0..n {
            if !cyclic[start] || reported[start] {
                continue;
            }
            let cycle = trace_cycle_path(start, &dependents, &cyclic);
            for &node in &cycle {
                reported[node] = true;
            }
            cycles.push(
                cycle
                    .iter()
                    .filter_map(|&i| fields.get_index(i).map(|(id, _)| id.clone()))
                    .collect(),
            );
        }

        debug!(
            fields = n,
            ordered = order.len(),
            cycles = cycles.len(),
            "Built computed field dependency graph"
        );

        Self {
            fields,
            dependents,
            order,
            cyclic,
            cycles,
        }
    }

    /// Acyclic fields in the order they must be evaluated.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|&i| self.id(i))
    }

    /// Fields that sit on a dependency cycle, in declaration order.
    pub fn cyclic_fields(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.fields.len())
            .filter(|&i| self.cyclic[i])
            .map(|i| self.id(i))
    }

    /// Every detected cycle as a path `a → b → ... → a`.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub fn is_cyclic(&self, field_id: &str) -> bool {
        self.fields
            .get_index_of(field_id)
            .is_some_and(|i| self.cyclic[i])
    }

    pub fn dependencies_of(&self, field_id: &str) -> &[String] {
        self.fields
            .get(field_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fields that read `field_id` directly.
    pub fn dependents_of(&self, field_id: &str) -> Vec<&str> {
        match self.fields.get_index_of(field_id) {
            Some(i) => self.dependents[i].iter().map(|&d| self.id(d)).collect(),
            None => Vec::new(),
        }
    }

    /// Fields whose value may change when the entity changes at
    /// `changed_path`: direct readers of an overlapping path plus everything
    /// transitively downstream of them. Acyclic fields come in evaluation
    /// order, cyclic ones after them.
    pub fn affected_by(&self, changed_path: &str) -> Vec<String> {
        let n = self.fields.len();
        let mut affected = vec![false; n];
        let mut stack: Vec<usize> = self
            .fields
            .values()
            .enumerate()
            .filter(|(_, deps)| deps.iter().any(|dep| path::overlaps(dep, changed_path)))
            .map(|(i, _)| i)
            .collect();
        while let Some(node) = stack.pop() {
            if !mem::replace(&mut affected[node], true) {
                stack.extend(&self.dependents[node]);
            }
        }

        self.order
            .iter()
            .copied()
            .chain((0..n).filter(|&i| self.cyclic[i]))
            .filter(|&i| affected[i])
            .map(|i| self.id(i).to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn id(&self, index: usize) -> &str {
        self.fields
            .get_index(index)
            .map(|(id, _)| id.as_str())
            .unwrap_or_default()
    }
}

/// Whether `deps` reads the computed field `field_id`. A bare `computed`
/// dependency reads every other field.
fn reads_computed(deps: &[String], field_id: &str, is_self: bool) -> bool {
    deps.iter().any(|dep| match path::parse_segments(dep).as_slice() {
        [PathSegment::Key(root)] => root == COMPUTED_ROOT && !is_self,
        [PathSegment::Key(root), PathSegment::Key(id), ..] => {
            root == COMPUTED_ROOT && id == field_id
        }
        _ => false,
    })
}

/// True when `target` can be reached from `start` through at least one edge.
fn reaches(dependents: &[Vec<usize>], start: usize, target: usize) -> bool {
    let mut seen = vec![false; dependents.len()];
    let mut stack = dependents[start].clone();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if !mem::replace(&mut seen[node], true) {
            stack.extend(&dependents[node]);
        }
    }
    false
}

/// Follows edges that stay on a cycle through `start` until a node repeats.
fn trace_cycle_path(start: usize, dependents: &[Vec<usize>], cyclic: &[bool]) -> Vec<usize> {
    let mut path = vec![start];
    let mut visited = vec![false; dependents.len()];
    visited[start] = true;

    let mut current = start;
    loop {
        let next = dependents[current]
            .iter()
            .copied()
            .find(|&d| d == start)
            .or_else(|| {
                dependents[current]
                    .iter()
                    .copied()
                    .find(|&d| cyclic[d] && reaches(dependents, d, start))
            });
        let Some(next) = next else {
            break;
        };
        path.push(next);
        if mem::replace(&mut visited[next], true) {
            break;
        }
        current = next;
    }
    path
}

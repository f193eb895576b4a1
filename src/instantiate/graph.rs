//! Dependency graph over normalized task paths and its creation order.
//!
//! Each blueprint becomes a node identified by its normalized path. Edges
//! point from a task to what must exist before it: every explicit
//! dependency plus an implicit edge to the parent path. Undeclared
//! ancestors get their own parent edges, up to the root. Ordering is a
//! depth-first post-order walk in node-insertion order, so ties keep
//! first-discovery order. A three-state marker turns any task-level cycle
//! into a [`InstantiateError::DependencyCycle`].

use crate::error::{InstantiateError, TemplateResult};
use crate::interpolate::interpolate_string;
use crate::paths;
use crate::types::{TaskBlueprint, VariableContext};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct GraphNode {
    path: String,
    /// Indices of nodes this one depends on, deduplicated, in insertion order.
    deps: Vec<usize>,
}

/// Directed graph of task paths to the paths they depend on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if missing and return its index.
    pub fn add_node(&mut self, path: &str) -> usize {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(GraphNode {
            path: path.to_string(),
            deps: Vec::new(),
        });
        self.index.insert(path.to_string(), idx);
        idx
    }

    /// Record that `from` depends on `to`. Both nodes are created on demand.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        let deps = &mut self.nodes[from_idx].deps;
        if !deps.contains(&to_idx) {
            deps.push(to_idx);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Paths the given node depends on.
    pub fn dependencies(&self, path: &str) -> Vec<&str> {
        self.index
            .get(path)
            .map(|&idx| {
                self.nodes[idx]
                    .deps
                    .iter()
                    .map(|&d| self.nodes[d].path.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every node after all nodes it depends on.
    pub fn topological_order(&self) -> TemplateResult<Vec<&str>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut stack: Vec<usize> = Vec::new();
        let mut order: Vec<usize> = Vec::with_capacity(self.nodes.len());

        for idx in 0..self.nodes.len() {
            self.visit(idx, &mut marks, &mut stack, &mut order)?;
        }

        Ok(order
            .into_iter()
            .map(|idx| self.nodes[idx].path.as_str())
            .collect())
    }

    fn visit(
        &self,
        idx: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> TemplateResult<()> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = stack.iter().position(|&s| s == idx).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|&s| self.nodes[s].path.clone())
                    .collect();
                cycle.push(self.nodes[idx].path.clone());
                return Err(InstantiateError::DependencyCycle { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[idx] = Mark::InProgress;
        stack.push(idx);
        for &dep in &self.nodes[idx].deps {
            self.visit(dep, marks, stack, order)?;
        }
        stack.pop();
        marks[idx] = Mark::Done;
        order.push(idx);
        Ok(())
    }
}

/// Interpolate, join onto the parent path, and normalize.
pub fn resolve_path(template: &str, ctx: &VariableContext, parent_path: Option<&str>) -> String {
    paths::resolve(parent_path, &interpolate_string(template, ctx))
}

/// Build the dependency graph for a set of blueprints.
///
/// Returns the graph and a map from normalized path to blueprint index.
/// Two blueprints resolving to the same path are rejected.
pub fn build_graph(
    blueprints: &[TaskBlueprint],
    ctx: &VariableContext,
    parent_path: Option<&str>,
) -> TemplateResult<(DependencyGraph, HashMap<String, usize>)> {
    let mut graph = DependencyGraph::new();
    let mut owners: HashMap<String, usize> = HashMap::new();

    for (i, blueprint) in blueprints.iter().enumerate() {
        let path = resolve_path(&blueprint.path, ctx, parent_path);
        if owners.insert(path.clone(), i).is_some() {
            return Err(InstantiateError::DuplicateTaskPath { path });
        }
        graph.add_node(&path);

        for dep in blueprint.dependency_list() {
            let dep_path = resolve_path(dep, ctx, parent_path);
            graph.add_edge(&path, &dep_path);
        }

        // Chain every level up to the root so a declared ancestor is ordered
        // first even when the paths in between are undeclared.
        let mut child = path;
        while let Some(parent) = paths::parent_path(&child) {
            graph.add_edge(&child, &parent);
            child = parent;
        }
    }

    Ok((graph, owners))
}

/// Order blueprints so each follows its dependencies and its parent.
///
/// Graph nodes with no blueprint (external dependencies, undeclared
/// ancestors) are dropped from the result.
pub fn order<'a>(
    blueprints: &'a [TaskBlueprint],
    ctx: &VariableContext,
    parent_path: Option<&str>,
) -> TemplateResult<Vec<&'a TaskBlueprint>> {
    let (graph, owners) = build_graph(blueprints, ctx, parent_path)?;
    let node_order = graph.topological_order()?;
    debug!(order = ?node_order, nodes = graph.len(), "Resolved task creation order");

    Ok(node_order
        .into_iter()
        .filter_map(|path| owners.get(path).map(|&i| &blueprints[i]))
        .collect())
}

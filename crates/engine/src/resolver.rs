// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered build ordering over declared dependencies.
//!
//! Nodes live in one table in declaration order; a node's `parent` and
//! `children` are indexes into it. Each resolution pass takes every node
//! whose children are already resolved, so a plan's steps are layers: a
//! dependency always appears in a later step than everything it needs.

use std::collections::{HashMap, HashSet};

use cmt_core::{Dependency, DependencySpec};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("circular dependency detected")]
    CircularDependency,
}

/// Index of a node in [`DependencyResolver::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub dependency: Dependency,
    /// Most recently linked declaring node. Lookup only.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Dependencies that can be built in parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub dependencies: Vec<Dependency>,
}

/// Steps to run in order; step N+1 starts only after step N succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
}

impl BuildPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every dependency, in build order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.steps.iter().flat_map(|s| s.dependencies.iter())
    }

    /// Index of the step that builds `dependency`.
    pub fn step_of(&self, dependency: &Dependency) -> Option<usize> {
        self.steps.iter().position(|s| s.dependencies.contains(dependency))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    nodes: Vec<DependencyNode>,
    projects: HashMap<String, NodeId>,
    targets: HashMap<(String, String), NodeId>,
}

impl DependencyResolver {
    pub fn new(specs: &[DependencySpec]) -> Self {
        let mut resolver = Self::default();

        // Declared nodes first, so they keep declaration order
        let declared: Vec<(NodeId, &[Dependency])> = specs
            .iter()
            .map(|spec| (resolver.intern(spec.dependency()), spec.dependencies.as_slice()))
            .collect();

        // Then undeclared children, linked to their parents
        for (parent, dependencies) in declared {
            for dependency in dependencies {
                let child = resolver.intern(dependency.clone());
                let children = &mut resolver.nodes[parent.0].children;
                if !children.contains(&child) {
                    children.push(child);
                }
                if child != parent {
                    resolver.nodes[child.0].parent = Some(parent);
                }
            }
        }
        resolver
    }

    fn intern(&mut self, dependency: Dependency) -> NodeId {
        if let Some(id) = self.lookup(&dependency) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        match &dependency.target {
            Some(target) => self.targets.insert((dependency.project.clone(), target.clone()), id),
            None => self.projects.insert(dependency.project.clone(), id),
        };
        self.nodes.push(DependencyNode { dependency, parent: None, children: Vec::new() });
        id
    }

    pub fn lookup(&self, dependency: &Dependency) -> Option<NodeId> {
        match &dependency.target {
            Some(target) => {
                self.targets.get(&(dependency.project.clone(), target.clone())).copied()
            }
            None => self.projects.get(&dependency.project).copied(),
        }
    }

    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    /// Order every known node.
    pub fn resolve(&self) -> Result<BuildPlan, ResolveError> {
        self.schedule((0..self.nodes.len()).map(NodeId).collect())
    }

    /// Order `request` and everything it transitively depends on.
    ///
    /// A request nobody declared builds on its own in a single step.
    pub fn resolve_for(&self, request: &Dependency) -> Result<BuildPlan, ResolveError> {
        let Some(root) = self.lookup(request) else {
            tracing::debug!(%request, "request has no declared dependencies");
            return Ok(BuildPlan {
                steps: vec![BuildStep { dependencies: vec![request.clone()] }],
            });
        };

        let mut reachable = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for &child in &self.nodes[id.0].children {
                if reachable.insert(child) {
                    stack.push(child);
                }
            }
        }
        let mut ids: Vec<NodeId> = reachable.into_iter().collect();
        ids.sort();
        self.schedule(ids)
    }

    fn schedule(&self, mut unresolved: Vec<NodeId>) -> Result<BuildPlan, ResolveError> {
        let mut resolved = HashSet::new();
        let mut plan = BuildPlan::default();

        while !unresolved.is_empty() {
            let ready: Vec<NodeId> = unresolved
                .iter()
                .copied()
                .filter(|id| self.nodes[id.0].children.iter().all(|c| resolved.contains(c)))
                .collect();
            if ready.is_empty() {
                tracing::warn!(unresolved = unresolved.len(), "circular dependency");
                return Err(ResolveError::CircularDependency);
            }

            let mut step = BuildStep::default();
            for id in &ready {
                let dependency = &self.nodes[id.0].dependency;
                // One batch per project per step
                if step.dependencies.iter().any(|d| d.project == dependency.project) {
                    plan.steps.push(std::mem::take(&mut step));
                }
                step.dependencies.push(dependency.clone());
            }
            plan.steps.push(step);

            resolved.extend(ready.iter().copied());
            unresolved.retain(|id| !resolved.contains(id));
        }
        Ok(plan)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

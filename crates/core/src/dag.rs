// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adjacency view over a workflow's links
//!
//! Nodes are addressed by id only; parents are derived once from the
//! child lists so walks in either direction are cheap.

use crate::error::WorkflowError;
use crate::ids::FwId;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Parent id to ordered child ids
pub type Links = BTreeMap<FwId, Vec<FwId>>;

/// Read-only graph view borrowed from a workflow
#[derive(Debug, Clone)]
pub struct Dag<'a> {
    nodes: BTreeSet<FwId>,
    links: &'a Links,
    parents: BTreeMap<FwId, Vec<FwId>>,
}

impl<'a> Dag<'a> {
    pub fn new(nodes: impl IntoIterator<Item = FwId>, links: &'a Links) -> Self {
        let nodes: BTreeSet<FwId> = nodes.into_iter().collect();
        let mut parents: BTreeMap<FwId, Vec<FwId>> = BTreeMap::new();
        for (parent, children) in links {
            for child in children {
                parents.entry(*child).or_default().push(*parent);
            }
        }
        Self {
            nodes,
            links,
            parents,
        }
    }

    pub fn nodes(&self) -> &BTreeSet<FwId> {
        &self.nodes
    }

    pub fn contains(&self, id: FwId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn children(&self, id: FwId) -> &[FwId] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents(&self, id: FwId) -> &[FwId] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes without parents
    pub fn roots(&self) -> Vec<FwId> {
        self.nodes
            .iter()
            .copied()
            .filter(|id| self.parents(*id).is_empty())
            .collect()
    }

    /// Nodes without children
    pub fn leaves(&self) -> Vec<FwId> {
        self.nodes
            .iter()
            .copied()
            .filter(|id| self.children(*id).is_empty())
            .collect()
    }

    /// Every node reachable from `start`, excluding `start` itself
    pub fn descendants(&self, start: FwId) -> BTreeSet<FwId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<FwId> = self.children(start).to_vec();
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend_from_slice(self.children(id));
            }
        }
        seen
    }

    /// Topological order of the given subset, lowest id first among peers
    pub fn order_subset(&self, subset: &BTreeSet<FwId>) -> Result<Vec<FwId>, WorkflowError> {
        let mut indegree: BTreeMap<FwId, usize> = subset.iter().map(|id| (*id, 0)).collect();
        for id in subset {
            for child in self.children(*id) {
                if let Some(degree) = indegree.get_mut(child) {
                    *degree += 1;
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<FwId>> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();
        let mut order = Vec::with_capacity(subset.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for child in self.children(id) {
                if let Some(degree) = indegree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*child));
                    }
                }
            }
        }

        if order.len() < subset.len() {
            let placed: BTreeSet<FwId> = order.iter().copied().collect();
            let stuck = subset.difference(&placed).copied().collect();
            return Err(WorkflowError::Cycle(stuck));
        }
        Ok(order)
    }

    /// Topological order of the whole graph
    pub fn topological_order(&self) -> Result<Vec<FwId>, WorkflowError> {
        self.order_subset(&self.nodes)
    }

    /// Check link endpoints, self-links, duplicate links and acyclicity
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (parent, children) in self.links {
            let mut seen = BTreeSet::new();
            for child in children {
                if !self.contains(*parent) || !self.contains(*child) {
                    return Err(WorkflowError::UnknownNode {
                        parent: *parent,
                        child: *child,
                    });
                }
                if parent == child {
                    return Err(WorkflowError::SelfLink(*parent));
                }
                if !seen.insert(*child) {
                    return Err(WorkflowError::DuplicateLink {
                        parent: *parent,
                        child: *child,
                    });
                }
            }
        }
        self.topological_order().map(|_| ())
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;

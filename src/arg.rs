//! Abstract reachability graphs.
//!
//! An [`Arg`] is the certificate shape consumed by the
//! [`CertificateChecker`][crate::pcc::CertificateChecker]: an arena of
//! abstract states connected by claimed parent/child edges, plus a covering
//! relation (`covered ⊑ covering`) between states of the same graph.

use std::fmt;

/// Handle of a node in an [`Arg`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArgNode<S> {
    state: S,
    parents: Vec<StateId>,
    children: Vec<StateId>,
    covered_by: Option<StateId>,
}

impl<S> ArgNode<S> {
    pub fn state(&self) -> &S {
        &self.state
    }
    pub fn parents(&self) -> &[StateId] {
        &self.parents
    }
    pub fn children(&self) -> &[StateId] {
        &self.children
    }
    pub fn covered_by(&self) -> Option<StateId> {
        self.covered_by
    }
    pub fn is_covered(&self) -> bool {
        self.covered_by.is_some()
    }
}

/// Abstract reachability graph.
///
/// # Invariants
///
/// - The graph is non-empty; the first node is the root.
/// - Every edge is recorded on both ends (`p ∈ parents(c) ⇔ c ∈ children(p)`),
///   unless the graph was deliberately built inconsistent with
///   [`ArgBuilder::add_child_only`] or [`ArgBuilder::add_parent_only`].
#[derive(Debug, Clone)]
pub struct Arg<S> {
    nodes: Vec<ArgNode<S>>,
}

impl<S> Arg<S> {
    pub fn root(&self) -> StateId {
        StateId(0)
    }

    pub fn node(&self, id: StateId) -> &ArgNode<S> {
        &self.nodes[id.0]
    }

    pub fn state(&self, id: StateId) -> &S {
        &self.node(id).state
    }

    pub fn parents(&self, id: StateId) -> &[StateId] {
        &self.node(id).parents
    }

    pub fn children(&self, id: StateId) -> &[StateId] {
        &self.node(id).children
    }

    pub fn covered_by(&self, id: StateId) -> Option<StateId> {
        self.node(id).covered_by
    }

    pub fn contains(&self, id: StateId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.nodes.len()).map(StateId)
    }

    /// Follows covering links starting at `id` and reports whether the walk
    /// terminates at an uncovered state.
    pub fn is_covering_cycle_free(&self, id: StateId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut current = id;
        loop {
            if seen[current.0] {
                return false;
            }
            seen[current.0] = true;
            match self.covered_by(current) {
                Some(next) => current = next,
                None => return true,
            }
        }
    }
}

/// Incremental builder for [`Arg`].
#[derive(Debug, Clone)]
pub struct ArgBuilder<S> {
    nodes: Vec<ArgNode<S>>,
}

impl<S> ArgBuilder<S> {
    /// Start a new graph with the given root state.
    pub fn new(root: S) -> Self {
        Self {
            nodes: vec![ArgNode {
                state: root,
                parents: Vec::new(),
                children: Vec::new(),
                covered_by: None,
            }],
        }
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    /// Add a state without any edges.
    pub fn add_state(&mut self, state: S) -> StateId {
        let id = StateId(self.nodes.len());
        self.nodes.push(ArgNode {
            state,
            parents: Vec::new(),
            children: Vec::new(),
            covered_by: None,
        });
        id
    }

    /// Add a new state as a successor of `parent`.
    pub fn add_child(&mut self, parent: StateId, state: S) -> StateId {
        let id = self.add_state(state);
        self.add_edge(parent, id);
        id
    }

    /// Add an edge between two existing states (merge point).
    pub fn add_edge(&mut self, parent: StateId, child: StateId) {
        assert!(parent.0 < self.nodes.len(), "Unknown parent {}", parent);
        assert!(child.0 < self.nodes.len(), "Unknown child {}", child);
        if !self.nodes[parent.0].children.contains(&child) {
            self.nodes[parent.0].children.push(child);
        }
        if !self.nodes[child.0].parents.contains(&parent) {
            self.nodes[child.0].parents.push(parent);
        }
    }

    /// Record `child` as a successor of `parent` without recording `parent`
    /// among the parents of `child`.
    pub fn add_child_only(&mut self, parent: StateId, child: StateId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Record `parent` among the parents of `child` without the matching
    /// successor edge.
    pub fn add_parent_only(&mut self, child: StateId, parent: StateId) {
        self.nodes[child.0].parents.push(parent);
    }

    /// Mark `covered` as subsumed by `covering`.
    pub fn set_covered_by(&mut self, covered: StateId, covering: StateId) {
        assert!(covered.0 < self.nodes.len(), "Unknown state {}", covered);
        assert!(covering.0 < self.nodes.len(), "Unknown state {}", covering);
        self.nodes[covered.0].covered_by = Some(covering);
    }

    pub fn build(self) -> Arg<S> {
        Arg { nodes: self.nodes }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_build_diamond() {
        let mut builder = ArgBuilder::new("root");
        let root = builder.root();
        let left = builder.add_child(root, "left");
        let right = builder.add_child(root, "right");
        let join = builder.add_child(left, "join");
        builder.add_edge(right, join);
        let arg = builder.build();

        assert_eq!(arg.len(), 4);
        assert_eq!(arg.root(), root);
        assert_eq!(arg.children(root), &[left, right]);
        assert_eq!(arg.parents(join), &[left, right]);
        assert_eq!(*arg.state(join), "join");
        assert!(!arg.node(join).is_covered());
    }

    #[test]
    fn test_duplicate_edges_are_ignored() {
        let mut builder = ArgBuilder::new(0);
        let a = builder.add_child(builder.root(), 1);
        builder.add_edge(builder.root(), a);
        let arg = builder.build();

        assert_eq!(arg.children(arg.root()), &[a]);
        assert_eq!(arg.parents(a), &[arg.root()]);
    }

    #[test]
    fn test_covering_cycle_detection() {
        let mut builder = ArgBuilder::new(0);
        let root = builder.root();
        let s1 = builder.add_child(root, 1);
        let s2 = builder.add_child(root, 2);
        let s3 = builder.add_child(root, 3);
        builder.set_covered_by(s3, s1);
        let acyclic = builder.clone().build();
        assert!(acyclic.is_covering_cycle_free(s3));
        assert!(acyclic.is_covering_cycle_free(s1));

        builder.set_covered_by(s1, s2);
        builder.set_covered_by(s2, s1);
        let cyclic = builder.build();
        assert!(!cyclic.is_covering_cycle_free(s1));
        assert!(!cyclic.is_covering_cycle_free(s3));
    }

    #[test]
    fn test_detached_state() {
        let mut builder = ArgBuilder::new(0);
        let lone = builder.add_state(7);
        let arg = builder.build();

        assert!(arg.contains(lone));
        assert!(arg.parents(lone).is_empty());
        assert!(arg.children(arg.root()).is_empty());
    }

    #[test]
    fn test_display_id() {
        let builder = ArgBuilder::new(());
        assert_eq!(builder.root().to_string(), "@0");
    }
}

//! Dependency graph construction and traversal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, Reversed, Walker};
use petgraph::Direction;
use tarn_core::name::PackageName;

/// Node payload of a [`DependencyGraph`].
pub trait GraphNode: fmt::Display {
    /// Unique key used for lookup and deduplication.
    fn key(&self) -> String;
}

/// Vertex of the resolver's result graph: the virtual root, or a resolved
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Vertex<K> {
    Root,
    Package(K),
}

impl<K: fmt::Display> fmt::Display for Vertex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Package(key) => write!(f, "{key}"),
        }
    }
}

impl<K: fmt::Display> GraphNode for Vertex<K> {
    fn key(&self) -> String {
        self.to_string()
    }
}

impl GraphNode for PackageName {
    fn key(&self) -> String {
        self.as_str().to_string()
    }
}

/// A dependency graph backed by petgraph.
pub struct DependencyGraph<N> {
    graph: DiGraph<N, ()>,
    index: HashMap<String, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl<N: GraphNode> DependencyGraph<N> {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Add or retrieve a node. If the key already exists, returns the existing index.
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        let key = node.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    /// Add a dependency edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &N {
        &self.graph[idx]
    }

    /// All nodes except the root.
    pub fn all_nodes(&self) -> Vec<&N> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Direct dependencies of a node, sorted by key.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Outgoing)
    }

    /// Reverse dependencies (who depends on this node), sorted by key.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Incoming)
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_by_key(|&n| self.graph[n].key());
        neighbors.dedup();
        neighbors
    }

    /// Every node from which one of `targets` can be reached, targets included.
    pub fn ancestors_of(&self, targets: &[NodeIndex]) -> HashSet<NodeIndex> {
        let reversed = Reversed(&self.graph);
        let mut found = HashSet::new();
        for &target in targets {
            if found.contains(&target) {
                continue;
            }
            found.extend(petgraph::visit::Bfs::new(reversed, target).iter(reversed));
        }
        found
    }

    /// Render the tree below the root with box-drawing connectors.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);
        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, idx) in deps.into_iter().enumerate() {
            self.print_subtree(&mut output, idx, "", i == count - 1, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, child) in deps.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from root to the node with `key`.
    pub fn find_path(&self, key: &str) -> Option<Vec<&N>> {
        let root = self.root?;
        let target = self.find(key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for next in self.dependencies_of(current) {
            if self.dfs_path(next, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Render the inverted tree (who depends on `key`, transitively).
    pub fn print_inverted_tree(&self, key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.find(key) else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(&mut output, dep, "", i == count - 1, &mut visited);
        }
        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(output, dep, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }

    /// Longest acyclic path length from the root to every reachable node.
    ///
    /// Nodes deeper in the graph get larger weights, so installing in
    /// descending weight order puts dependencies before their dependents.
    /// Cycles are broken by ignoring edges back into the current path.
    pub fn topological_weights(&self) -> HashMap<NodeIndex, usize> {
        let mut weights = HashMap::new();
        if let Some(root) = self.root {
            let mut path = HashSet::new();
            self.visit_weights(root, 0, &mut path, &mut weights);
        }
        weights
    }

    fn visit_weights(
        &self,
        idx: NodeIndex,
        depth: usize,
        path: &mut HashSet<NodeIndex>,
        weights: &mut HashMap<NodeIndex, usize>,
    ) {
        if path.contains(&idx) {
            return;
        }
        if weights.get(&idx).is_some_and(|&w| w >= depth) {
            return;
        }
        let weight = weights.entry(idx).or_insert(depth);
        *weight = (*weight).max(depth);

        path.insert(idx);
        for child in self.dependencies_of(idx) {
            self.visit_weights(child, depth + 1, path, weights);
        }
        path.remove(&idx);
    }

    /// Number of nodes (excluding root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<N: GraphNode> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

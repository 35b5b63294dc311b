//! Operation: display the resolved dependency tree.

use std::collections::HashSet;
use std::fmt;

use tarn_resolver::graph::{DependencyGraph, GraphNode, Vertex};
use tarn_resolver::Resolution;

use crate::ops_resolve::{run_resolver, ResolveFlags};
use crate::ops_setup::Inputs;

/// Options for `tarn tree`.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub inputs: Inputs,
    pub flags: ResolveFlags,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show what pulls in this identifier instead of the whole tree.
    pub why: Option<String>,
}

/// A pinned identifier and its version, as shown in the tree.
#[derive(Debug, Clone)]
enum TreeNode {
    Root,
    Pinned { identifier: String, version: String },
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Pinned { identifier, version } => write!(f, "{identifier} {version}"),
        }
    }
}

impl GraphNode for TreeNode {
    fn key(&self) -> String {
        match self {
            Self::Root => "<root>".to_string(),
            Self::Pinned { identifier, .. } => identifier.clone(),
        }
    }
}

/// Copy the resolver graph, labelling each identifier with its pin.
fn labelled_graph(resolution: &Resolution) -> DependencyGraph<TreeNode> {
    let source = &resolution.graph;
    let mut graph = DependencyGraph::new();
    let Some(root) = source.root else {
        return graph;
    };
    let root_idx = graph.add_node(TreeNode::Root);
    graph.set_root(root_idx);

    let mut seen = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        let from = graph.add_node(label(resolution, source.node(idx)));
        for child in source.dependencies_of(idx) {
            let to = graph.add_node(label(resolution, source.node(child)));
            graph.add_edge(from, to);
            if seen.insert(child) {
                stack.push(child);
            }
        }
    }
    graph
}

fn label(resolution: &Resolution, vertex: &Vertex<String>) -> TreeNode {
    match vertex {
        Vertex::Root => TreeNode::Root,
        Vertex::Package(identifier) => TreeNode::Pinned {
            identifier: identifier.clone(),
            version: resolution
                .mapping
                .get(identifier)
                .map(|c| c.version().to_string())
                .unwrap_or_default(),
        },
    }
}

/// Resolve and print the tree, or the dependents of `--why`.
pub fn tree(opts: &TreeOptions) -> miette::Result<()> {
    let config = opts.inputs.load_config()?;
    let (resolution, _, _) = run_resolver(&opts.inputs, &opts.flags, &config)?;
    let graph = labelled_graph(&resolution);

    if let Some(target) = &opts.why {
        match graph.find_path(target) {
            Some(path) => {
                println!("Path to {target}:");
                for (i, node) in path.iter().enumerate() {
                    let indent = "  ".repeat(i);
                    println!("{indent}{node}");
                }
                println!();
                print!("{}", graph.print_inverted_tree(target));
            }
            None => println!("Dependency '{target}' not found in the graph."),
        }
        return Ok(());
    }

    print!("{}", graph.print_tree(opts.depth));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tarn_core::index::{PackageRecord, StaticIndex};
    use tarn_core::requirement::InstallRequirement;
    use tarn_resolver::{PackageResolver, ResolveOptions};

    fn resolution() -> Resolution {
        let mut index = StaticIndex::new();
        index.add(PackageRecord::new("web", "2.0").requires(&["core"])).unwrap();
        index.add(PackageRecord::new("db", "0.4").requires(&["core"])).unwrap();
        index.add(PackageRecord::new("core", "1.5")).unwrap();
        let roots = ["web", "db"]
            .iter()
            .map(|r| InstallRequirement::parse(r).unwrap().with_user_supplied(true))
            .collect();
        PackageResolver::new(Rc::new(index), None, ResolveOptions::default())
            .resolve(roots)
            .unwrap()
    }

    #[test]
    fn tree_shows_pinned_versions() {
        let graph = labelled_graph(&resolution());
        assert_eq!(
            graph.print_tree(None),
            "<root>\n├── db 0.4\n│   └── core 1.5\n└── web 2.0\n    └── core 1.5\n"
        );
        assert_eq!(graph.print_tree(Some(1)), "<root>\n├── db 0.4\n└── web 2.0\n");
    }

    #[test]
    fn why_lists_dependents() {
        let graph = labelled_graph(&resolution());
        assert_eq!(
            graph.print_inverted_tree("core"),
            "core 1.5\n├── db 0.4\n│   └── <root>\n└── web 2.0\n    └── <root>\n"
        );
    }
}

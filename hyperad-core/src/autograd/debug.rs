// src/autograd/debug.rs
use crate::autograd::graph::Hypergraph;
use std::fmt::Write;

impl Hypergraph {
    /// Renders the graph in Graphviz `dot` syntax.
    ///
    /// Each node is labelled with its variable name and the operator producing
    /// it; each tail input becomes a `tail -> head` arrow. Evaluation state is
    /// not touched.
    pub fn graphviz(&self) -> String {
        let mut out = String::from("digraph G {\n  rankdir=LR;\n  nodesep=.05;\n");
        for (nc, node) in self.nodes.iter().enumerate() {
            let in_edge = &self.edges[node.in_edge];
            let var_names: Vec<String> = in_edge.tail.iter().map(|t| t.to_string()).collect();
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "  N{} [label=\"v{} = {}\"];",
                nc,
                nc,
                in_edge.op.describe(&var_names)
            );
        }
        for edge in &self.edges {
            for ni in &edge.tail {
                let _ = writeln!(out, "  N{} -> N{};", ni.index(), edge.head.index());
            }
        }
        out.push_str("}\n");
        out
    }

    /// Writes [`graphviz`](Self::graphviz) to stderr.
    pub fn print_graphviz(&self) {
        eprint!("{}", self.graphviz());
    }
}

//! Graphviz export of the manifest dependency graph

use std::fmt::Write;

use crate::module::build::order::DependencyGraph;

/// Render `graph` as a DOT digraph (edges point from module to dependency)
pub fn to_dot(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph \"modules\" {\n");
    out.push_str("  rankdir=\"LR\";\n");
    out.push_str("  node [shape=box, style=\"rounded,filled\", fillcolor=\"#EFEFEF\"];\n\n");

    for entry in &graph.entries {
        if entry.dependencies.is_empty() {
            // Isolated nodes still appear
            let _ = writeln!(out, "  {};", quote(&entry.module));
        }
        for dep in &entry.dependencies {
            let _ = writeln!(out, "  {} -> {};", quote(&entry.module), quote(dep));
        }
    }

    for dropped in &graph.dropped {
        let _ = writeln!(
            out,
            "  {} -> {} [style=dashed, color=red];",
            quote(&dropped.module),
            quote(&dropped.dependency)
        );
    }

    out.push('}');
    out.push('\n');
    out
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

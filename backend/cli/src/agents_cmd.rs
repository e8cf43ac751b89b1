//! CLI Agents and Tools listings.

use adkit_config::AdkConfig;
use adkit_core::ToolRegistry;

use crate::terminal_output::{note_info, render_table};

/// Indented tree of the root agent and its members, as configured.
pub fn agent_tree(config: &AdkConfig) -> Vec<String> {
    fn walk(config: &AdkConfig, name: &str, depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        if let Some(agent) = config.agent(name) {
            let model = agent.model.as_deref().unwrap_or(config.default_model());
            let mut line = format!("{indent}{name} (llm, {model})");
            if !agent.tools.is_empty() {
                line.push_str(&format!(" tools: {}", agent.tools.join(", ")));
            }
            if let Some(key) = &agent.output_key {
                line.push_str(&format!(" -> {key}"));
            }
            out.push(line);
        } else if let Some(pipeline) = config.pipeline(name) {
            let mut line = format!("{indent}{name} ({})", pipeline.kind);
            if let Some(max) = pipeline.max_iterations {
                line.push_str(&format!(" max {max}"));
            }
            out.push(line);
            // Validation rules out cycles; the depth cap guards unvalidated input.
            if depth < 16 {
                for member in &pipeline.agents {
                    walk(config, member, depth + 1, out);
                }
            }
        } else {
            out.push(format!("{indent}{name} (missing)"));
        }
    }

    let mut out = Vec::new();
    if let Some(root) = &config.root {
        walk(config, root, 0, &mut out);
    }
    out
}

pub fn list_agents(config: &AdkConfig) {
    let tree = agent_tree(config);
    if tree.is_empty() {
        note_info("No agents configured.");
        return;
    }
    for line in tree {
        println!("{line}");
    }
}

pub fn list_tools(tools: &ToolRegistry) {
    let rows: Vec<Vec<String>> = tools
        .declarations()
        .into_iter()
        .map(|d| vec![d.name, d.description])
        .collect();
    print!("{}", render_table(&["Tool", "Description"], &rows, 80));
}

//! Templated assembly of the implementation summary pushed by a generation
//! task. No model is involved: the document is built from content the
//! project already holds.

use crate::project::Project;
use crate::spec_tree::{self, SpecNode};

pub fn commit_message(project: &Project) -> String {
    format!(
        "Add OpenSpec implementation summary for {}",
        project.project_name
    )
}

/// Render the summary for a project's current tree.
///
/// Each top-level node becomes one `## ` section in stored order. A
/// top-level node with children contributes its leaf documents instead,
/// in pre-order.
pub fn render(project: &Project) -> String {
    let mut out = format!(
        "# {}: OpenSpec Implementation Summary\n\nGenerated from the uploaded specification bundle.\n",
        project.project_name
    );

    for node in &project.spec_tree {
        if node.children.is_empty() {
            push_section(&mut out, node);
        } else {
            for doc in spec_tree::documents(std::slice::from_ref(node)) {
                push_section(&mut out, doc);
            }
        }
    }
    out
}

fn push_section(out: &mut String, node: &SpecNode) {
    out.push_str("\n## ");
    out.push_str(&node.name);
    out.push_str("\n\n");
    out.push_str(node.content.trim_end());
    out.push('\n');
}

use serde::Serialize;
use specflow_core::spec_tree::SpecNode;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned columns, two spaces apart, with a dashed rule under the header.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    line(headers.to_vec());
    line(rule.iter().map(String::as_str).collect());
    for row in rows {
        line(row.iter().map(String::as_str).collect());
    }
}

/// Render a tree as an indented listing, one node per line.
pub fn tree_lines(nodes: &[SpecNode]) -> Vec<String> {
    let mut out = Vec::new();
    push_lines(nodes, 0, &mut out);
    out
}

fn push_lines(nodes: &[SpecNode], depth: usize, out: &mut Vec<String>) {
    for node in nodes {
        out.push(format!("{}{} [{}]", "  ".repeat(depth), node.name, node.kind));
        push_lines(&node.children, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specflow_core::types::NodeKind;

    #[test]
    fn tree_lines_indent_children() {
        let mut dir = SpecNode::directory("changes", "openspec/changes", NodeKind::Change);
        dir.children.push(SpecNode::document(
            "proposal.md",
            "openspec/changes/proposal.md",
            NodeKind::Specification,
            "# MFA",
        ));
        let lines = tree_lines(&[dir]);
        assert_eq!(lines, vec!["changes [change]", "  proposal.md [specification]"]);
    }
}

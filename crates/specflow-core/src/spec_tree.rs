//! The specification tree: an ordered forest of [`SpecNode`]s owned by a
//! project.
//!
//! Children are stored inline (`Vec<SpecNode>`), so every node has exactly
//! one owner and the structure cannot form cycles or share subtrees. All
//! lookups walk the forest depth-first, pre-order, children in stored order.

use crate::error::{Result, SpecflowError};
use crate::types::{advance, new_id, NodeKind, Suggestion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecNode {
    pub id: String,
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<SpecNode>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    pub updated_at: DateTime<Utc>,
}

impl SpecNode {
    /// A leaf document node with a freshly minted id.
    pub fn document(
        name: impl Into<String>,
        path: impl Into<String>,
        kind: NodeKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            path: path.into(),
            kind,
            content: content.into(),
            children: Vec::new(),
            suggestions: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// An empty grouping node.
    pub fn directory(name: impl Into<String>, path: impl Into<String>, kind: NodeKind) -> Self {
        Self::document(name, path, kind, String::new())
    }
}

/// Partial update for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecPatch {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<Suggestion>>,
}

impl SpecPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            suggestions: None,
        }
    }

    pub fn suggestions(suggestions: Vec<Suggestion>) -> Self {
        Self {
            content: None,
            suggestions: Some(suggestions),
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Pre-order iterator over a forest.
pub struct Walk<'a> {
    stack: Vec<std::slice::Iter<'a, SpecNode>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SpecNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    if !node.children.is_empty() {
                        self.stack.push(node.children.iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

pub fn walk(nodes: &[SpecNode]) -> Walk<'_> {
    Walk {
        stack: vec![nodes.iter()],
    }
}

/// Total number of nodes in the forest.
pub fn len(nodes: &[SpecNode]) -> usize {
    walk(nodes).count()
}

/// Leaf documents in pre-order. Directory nodes are skipped.
pub fn documents(nodes: &[SpecNode]) -> Vec<&SpecNode> {
    walk(nodes)
        .filter(|n| n.kind.is_document() && n.children.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Lookup and mutation
// ---------------------------------------------------------------------------

/// First node (pre-order) whose id matches.
pub fn find<'a>(nodes: &'a [SpecNode], id: &str) -> Option<&'a SpecNode> {
    walk(nodes).find(|n| n.id == id)
}

pub fn find_mut<'a>(nodes: &'a mut [SpecNode], id: &str) -> Option<&'a mut SpecNode> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Merge `patch` into the node with the given id and refresh its timestamp.
pub fn update<'a>(nodes: &'a mut [SpecNode], id: &str, patch: SpecPatch) -> Result<&'a SpecNode> {
    let node = find_mut(nodes, id).ok_or_else(|| SpecflowError::SpecNotFound(id.to_string()))?;
    if let Some(content) = patch.content {
        node.content = content;
    }
    if let Some(suggestions) = patch.suggestions {
        node.suggestions = suggestions;
    }
    node.updated_at = advance(node.updated_at);
    Ok(node)
}

/// Reject forests in which an id appears more than once.
pub fn check_unique_ids(nodes: &[SpecNode]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in walk(nodes) {
        if !seen.insert(node.id.as_str()) {
            return Err(SpecflowError::Validation(format!(
                "duplicate specification id '{}'",
                node.id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> SpecNode {
        SpecNode::document(name, name, NodeKind::Specification, format!("# {name}"))
    }

    fn sample() -> Vec<SpecNode> {
        let mut dir = SpecNode::directory("specs", "specs", NodeKind::Directory);
        let mut nested = SpecNode::directory("auth", "specs/auth", NodeKind::Directory);
        nested.children.push(doc("login.md"));
        dir.children.push(nested);
        dir.children.push(doc("billing.md"));
        vec![doc("project.md"), dir, doc("README.md")]
    }

    #[test]
    fn walk_is_preorder_in_stored_order() {
        let tree = sample();
        let names: Vec<&str> = walk(&tree).map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["project.md", "specs", "auth", "login.md", "billing.md", "README.md"]
        );
        assert_eq!(len(&tree), 6);
    }

    #[test]
    fn find_locates_every_issued_id() {
        let tree = sample();
        let ids: Vec<String> = walk(&tree).map(|n| n.id.clone()).collect();
        for id in &ids {
            let hits = walk(&tree).filter(|n| &n.id == id).count();
            assert_eq!(hits, 1);
            assert_eq!(&find(&tree, id).unwrap().id, id);
        }
        assert!(find(&tree, "never-issued").is_none());
    }

    #[test]
    fn content_patch_keeps_suggestions() {
        let mut tree = sample();
        let id = tree[0].id.clone();
        update(&mut tree, &id, SpecPatch::suggestions(vec![Suggestion::new("tighten scope")]))
            .unwrap();

        let before = find(&tree, &id).unwrap().updated_at;
        let node = update(&mut tree, &id, SpecPatch::content("# Rewritten")).unwrap();
        assert_eq!(node.content, "# Rewritten");
        assert_eq!(node.suggestions.len(), 1);
        assert_eq!(node.suggestions[0].content, "tighten scope");
        assert!(node.updated_at > before);
    }

    #[test]
    fn suggestion_patch_keeps_content() {
        let mut tree = sample();
        let login_id = documents(&tree)
            .into_iter()
            .find(|n| n.name == "login.md")
            .unwrap()
            .id
            .clone();

        let node = update(
            &mut tree,
            &login_id,
            SpecPatch::suggestions(vec![Suggestion::new("a"), Suggestion::new("b")]),
        )
        .unwrap();
        assert_eq!(node.content, "# login.md");
        assert_eq!(node.suggestions.len(), 2);
    }

    #[test]
    fn suggestions_are_replaced_wholesale() {
        let mut tree = sample();
        let id = tree[2].id.clone();
        update(&mut tree, &id, SpecPatch::suggestions(vec![Suggestion::new("old")])).unwrap();
        update(&mut tree, &id, SpecPatch::suggestions(vec![Suggestion::new("new")])).unwrap();
        let node = find(&tree, &id).unwrap();
        assert_eq!(node.suggestions.len(), 1);
        assert_eq!(node.suggestions[0].content, "new");
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut tree = sample();
        let err = update(&mut tree, "missing", SpecPatch::content("x")).unwrap_err();
        assert!(matches!(err, SpecflowError::SpecNotFound(ref id) if id == "missing"));
    }

    #[test]
    fn documents_skip_directories() {
        let tree = sample();
        let names: Vec<&str> = documents(&tree).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["project.md", "login.md", "billing.md", "README.md"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut tree = sample();
        assert!(check_unique_ids(&tree).is_ok());
        let clone = tree[0].clone();
        tree[1].children.push(clone);
        assert!(matches!(
            check_unique_ids(&tree),
            Err(SpecflowError::Validation(_))
        ));
    }
}

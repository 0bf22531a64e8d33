//! Where a project's documents land in the target repository.
//!
//! A generation run copies every uploaded document under
//! `openspec/changes/<change id>/` on the feature branch. The change id is
//! the archive's root directory when the tree has one, otherwise the
//! sanitised bundle name.

use crate::project::Project;
use crate::spec_tree::walk;
use regex::Regex;
use std::sync::OnceLock;

pub const CHANGES_ROOT: &str = "openspec/changes";

const FALLBACK_CHANGE_ID: &str = "change";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedFile {
    pub path: String,
    pub content: String,
}

fn change_id_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"))
}

/// Name of the top-level grouping node, if the tree was built from an
/// archive with a root directory.
fn root_directory(project: &Project) -> Option<&str> {
    project
        .spec_tree
        .iter()
        .find(|n| !n.kind.is_document() || !n.children.is_empty())
        .map(|n| n.name.as_str())
}

pub fn change_id(project: &Project) -> String {
    if let Some(root) = root_directory(project) {
        return root.to_string();
    }
    let raw = project
        .bundle
        .as_ref()
        .map(|b| b.name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_CHANGE_ID);
    let stem = if raw.to_lowercase().ends_with(".zip") {
        &raw[..raw.len() - 4]
    } else {
        raw
    };
    change_id_chars().replace_all(stem, "-").into_owned()
}

/// Every document with content, mapped to its repository path, in tree
/// order.
pub fn synced_files(project: &Project) -> Vec<SyncedFile> {
    let prefix = match root_directory(project) {
        Some(_) => CHANGES_ROOT.to_string(),
        None => format!("{CHANGES_ROOT}/{}", change_id(project)),
    };
    walk(&project.spec_tree)
        .filter(|n| n.kind.is_document() && !n.content.is_empty())
        .map(|n| SyncedFile {
            path: format!("{prefix}/{}", n.path.trim_start_matches('/')),
            content: n.content.clone(),
        })
        .collect()
}

pub fn sync_commit_message(change_id: &str) -> String {
    format!("Sync OpenSpec files for change {change_id}")
}

/// Browse URL of `branch`, the form the task agent expects.
pub fn branch_url(project: &Project, branch: &str) -> String {
    format!(
        "https://github.com/{}/{}/tree/{branch}",
        project.owner, project.repository
    )
}

/// Instructions handed to the task agent when the caller gave none.
pub fn default_agent_prompt(branch: &str, change_id: &str) -> String {
    format!(
        "Checkout branch '{branch}'. Read the OpenSpec files at '{CHANGES_ROOT}/{change_id}/' \
         and implement the changes described. Provide a summary of changes."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{build_tree, BundleEntry, Layout};
    use crate::project::{BundleInfo, NewProject, ProjectRegistry};
    use crate::spec_tree::SpecNode;
    use crate::types::NodeKind;
    use chrono::Utc;

    fn project(tree: Vec<SpecNode>, bundle_name: Option<&str>) -> Project {
        let mut reg = ProjectRegistry::new();
        let p = reg
            .create(NewProject {
                project_name: "Demo".into(),
                owner: "alice".into(),
                repository: "demo-repo".into(),
                ..NewProject::default()
            })
            .unwrap();
        match bundle_name {
            Some(name) => {
                let info = BundleInfo {
                    name: name.into(),
                    size_bytes: 1,
                    uploaded_at: Utc::now(),
                };
                reg.attach_bundle(&p.id, tree, info).unwrap().clone()
            }
            None => reg.attach_spec_tree(&p.id, tree).unwrap().clone(),
        }
    }

    fn entry(path: &str, content: &str) -> BundleEntry {
        BundleEntry {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            kind: NodeKind::Specification,
            content: content.to_string(),
        }
    }

    #[test]
    fn flat_tree_is_filed_under_bundle_name() {
        let tree = vec![
            SpecNode::document("login.md", "specs/login.md", NodeKind::Specification, "# Login"),
            SpecNode::document("empty.md", "specs/empty.md", NodeKind::Specification, ""),
        ];
        let p = project(tree, Some("add mfa.zip"));
        assert_eq!(change_id(&p), "add-mfa");
        assert_eq!(
            synced_files(&p),
            vec![SyncedFile {
                path: "openspec/changes/add-mfa/specs/login.md".into(),
                content: "# Login".into(),
            }]
        );
    }

    #[test]
    fn root_directory_names_the_change() {
        let tree = build_tree(
            vec![
                entry("add-mfa/proposal.md", "# Proposal"),
                entry("add-mfa/specs/auth.md", "# Auth"),
            ],
            Layout::Nested,
        );
        let p = project(tree, Some("bundle.zip"));
        assert_eq!(change_id(&p), "add-mfa");
        let paths: Vec<String> = synced_files(&p).into_iter().map(|f| f.path).collect();
        assert_eq!(
            paths,
            vec![
                "openspec/changes/add-mfa/proposal.md",
                "openspec/changes/add-mfa/specs/auth.md",
            ]
        );
    }

    #[test]
    fn missing_bundle_uses_fallback_id() {
        let p = project(Vec::new(), None);
        assert_eq!(change_id(&p), "change");
        assert!(synced_files(&p).is_empty());
    }

    #[test]
    fn agent_inputs_name_branch_and_change() {
        let p = project(Vec::new(), None);
        assert_eq!(
            branch_url(&p, "feature/x"),
            "https://github.com/alice/demo-repo/tree/feature/x"
        );
        let prompt = default_agent_prompt("feature/x", "add-mfa");
        assert!(prompt.contains("'feature/x'"));
        assert!(prompt.contains("openspec/changes/add-mfa/"));
    }
}

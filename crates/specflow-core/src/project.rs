use crate::error::{Result, SpecflowError};
use crate::spec_tree::{self, SpecNode};
use crate::types::{advance, new_id};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Branch base used when a project has no uploaded bundle to name it after.
pub const DEFAULT_BRANCH_BASE: &str = "openspec-implementation";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    pub repository: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub spec_tree: Vec<SpecNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata about the most recently uploaded archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    pub name: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub is_private: Option<bool>,
}

impl NewProject {
    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.project_name.trim().is_empty() {
            missing.push("projectName");
        }
        if self.owner.trim().is_empty() {
            missing.push("owner");
        }
        if self.repository.trim().is_empty() {
            missing.push("repository");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SpecflowError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectRegistry
// ---------------------------------------------------------------------------

/// Owns every project record for the lifetime of a session.
///
/// The registry itself is not synchronised; callers that share it across
/// threads wrap it in a mutex.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: HashMap<String, Project>,
    order: Vec<String>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, input: NewProject) -> Result<Project> {
        input.validate()?;

        let mut id = new_id();
        while self.projects.contains_key(&id) {
            id = new_id();
        }
        let now = Utc::now();
        let project = Project {
            id: id.clone(),
            project_name: input.project_name,
            description: input.description.unwrap_or_default(),
            owner: input.owner,
            repository: input.repository,
            is_private: input.is_private.unwrap_or(false),
            spec_tree: Vec::new(),
            bundle: None,
            created_at: now,
            updated_at: now,
        };
        self.order.push(id.clone());
        self.projects.insert(id, project.clone());
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Result<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| SpecflowError::ProjectNotFound(id.to_string()))
    }

    /// All projects, oldest first.
    pub fn list(&self) -> Vec<&Project> {
        self.order
            .iter()
            .filter_map(|id| self.projects.get(id))
            .collect()
    }

    /// Replace the project's tree wholesale.
    pub fn attach_spec_tree(&mut self, id: &str, tree: Vec<SpecNode>) -> Result<&Project> {
        spec_tree::check_unique_ids(&tree)?;
        let project = self.get_mut(id)?;
        project.spec_tree = tree;
        project.updated_at = advance(project.updated_at);
        Ok(project)
    }

    /// Replace the tree and remember which archive it came from.
    pub fn attach_bundle(
        &mut self,
        id: &str,
        tree: Vec<SpecNode>,
        bundle: BundleInfo,
    ) -> Result<&Project> {
        self.attach_spec_tree(id, tree)?;
        let project = self.get_mut(id)?;
        project.bundle = Some(bundle);
        Ok(project)
    }

    /// Scoped mutable access to a project's tree. Bumps `updated_at` when
    /// the closure succeeds.
    pub fn with_tree_mut<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Vec<SpecNode>) -> Result<T>,
    ) -> Result<T> {
        let project = self.get_mut(id)?;
        let out = f(&mut project.spec_tree)?;
        project.updated_at = advance(project.updated_at);
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Project> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| SpecflowError::ProjectNotFound(id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Branch naming
// ---------------------------------------------------------------------------

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"))
}

/// `feature/<bundle name>-<timestamp>`, e.g.
/// `feature/add-mfa-20250101-120000`.
pub fn suggested_branch(project: &Project, now: DateTime<Utc>) -> String {
    let base = match &project.bundle {
        Some(bundle) if !bundle.name.is_empty() => {
            let raw = bundle.name.as_str();
            let stem = if raw.to_lowercase().ends_with(".zip") {
                &raw[..raw.len() - 4]
            } else {
                raw
            };
            non_alphanumeric().replace_all(stem, "-").into_owned()
        }
        _ => DEFAULT_BRANCH_BASE.to_string(),
    };
    format!("feature/{base}-{}", now.format("%Y%m%d-%H%M%S"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_tree::{find, SpecPatch};
    use crate::types::NodeKind;
    use chrono::TimeZone;

    fn demo() -> NewProject {
        NewProject {
            project_name: "Demo".into(),
            owner: "alice".into(),
            repository: "demo-repo".into(),
            ..NewProject::default()
        }
    }

    #[test]
    fn create_then_get() {
        let mut reg = ProjectRegistry::new();
        let p = reg.create(demo()).unwrap();
        assert_eq!(p.project_name, "Demo");
        assert!(!p.is_private);
        assert_eq!(p.description, "");
        assert!(p.spec_tree.is_empty());

        let fetched = reg.get(&p.id).unwrap();
        assert_eq!(fetched.owner, "alice");
        assert_eq!(fetched.repository, "demo-repo");
    }

    #[test]
    fn create_requires_name_owner_repository() {
        let mut reg = ProjectRegistry::new();
        let err = reg
            .create(NewProject {
                project_name: "  ".into(),
                ..NewProject::default()
            })
            .unwrap_err();
        match err {
            SpecflowError::Validation(msg) => {
                assert!(msg.contains("projectName"));
                assert!(msg.contains("owner"));
                assert!(msg.contains("repository"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn ids_are_fresh() {
        let mut reg = ProjectRegistry::new();
        let a = reg.create(demo()).unwrap();
        let b = reg.create(demo()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.list()[0].id, a.id);
    }

    #[test]
    fn unknown_project_is_not_found() {
        let mut reg = ProjectRegistry::new();
        assert!(matches!(
            reg.get("nope"),
            Err(SpecflowError::ProjectNotFound(_))
        ));
        assert!(matches!(
            reg.attach_spec_tree("nope", Vec::new()),
            Err(SpecflowError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn attach_replaces_tree_and_bumps_timestamp() {
        let mut reg = ProjectRegistry::new();
        let p = reg.create(demo()).unwrap();
        let first = vec![SpecNode::document("a.md", "a.md", NodeKind::Specification, "a")];
        reg.attach_spec_tree(&p.id, first).unwrap();

        let second = vec![
            SpecNode::document("b.md", "b.md", NodeKind::Specification, "b"),
            SpecNode::document("c.md", "c.md", NodeKind::Change, "c"),
        ];
        let updated = reg.attach_spec_tree(&p.id, second).unwrap();
        assert_eq!(updated.spec_tree.len(), 2);
        assert_eq!(updated.spec_tree[0].name, "b.md");
        assert!(updated.updated_at > p.updated_at);
    }

    #[test]
    fn tree_mutation_goes_through_registry() {
        let mut reg = ProjectRegistry::new();
        let p = reg.create(demo()).unwrap();
        let node = SpecNode::document("a.md", "a.md", NodeKind::Specification, "old");
        let node_id = node.id.clone();
        reg.attach_spec_tree(&p.id, vec![node]).unwrap();

        reg.with_tree_mut(&p.id, |tree| {
            spec_tree::update(tree, &node_id, SpecPatch::content("new")).map(|_| ())
        })
        .unwrap();
        let tree = &reg.get(&p.id).unwrap().spec_tree;
        assert_eq!(find(tree, &node_id).unwrap().content, "new");

        let err = reg
            .with_tree_mut(&p.id, |tree| {
                spec_tree::update(tree, "missing", SpecPatch::content("x")).map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, SpecflowError::SpecNotFound(_)));
    }

    #[test]
    fn suggested_branch_uses_bundle_name() {
        let mut reg = ProjectRegistry::new();
        let p = reg.create(demo()).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            suggested_branch(reg.get(&p.id).unwrap(), at),
            "feature/openspec-implementation-20250304-050607"
        );

        let info = BundleInfo {
            name: "add mfa_v2.zip".into(),
            size_bytes: 10,
            uploaded_at: at,
        };
        let with_bundle = reg.attach_bundle(&p.id, Vec::new(), info).unwrap();
        assert_eq!(
            suggested_branch(with_bundle, at),
            "feature/add-mfa-v2-20250304-050607"
        );
    }
}

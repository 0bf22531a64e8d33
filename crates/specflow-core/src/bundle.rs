//! OpenSpec bundle ingestion: validate an uploaded zip archive, extract its
//! markdown documents, and build a specification tree from them.

use crate::error::{Result, SpecflowError};
use crate::spec_tree::SpecNode;
use crate::types::NodeKind;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use tracing::{debug, warn};

const DOCUMENT_EXTENSION: &str = ".md";

/// Default cap on one extracted document.
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Default cap on all extracted documents together.
pub const DEFAULT_MAX_BUNDLE_BYTES: u64 = 64 * 1024 * 1024;

/// Uncompressed size caps applied while extracting. The upload body limit
/// only bounds the compressed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_document_bytes: u64,
    pub max_bundle_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_bundle_bytes: DEFAULT_MAX_BUNDLE_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// How extracted documents are arranged into a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One top-level leaf per document, in path order.
    #[default]
    Flat,
    /// Directories from the archive paths become `directory` nodes.
    Nested,
}

impl std::str::FromStr for Layout {
    type Err = SpecflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(Layout::Flat),
            "nested" => Ok(Layout::Nested),
            other => Err(SpecflowError::Validation(format!(
                "unknown layout '{other}': expected 'flat' or 'nested'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReport {
    pub is_valid: bool,
    pub has_openspec_dir: bool,
    pub has_changes_dir: bool,
    pub has_specs_dir: bool,
    pub has_project_md: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BundleReport {
    /// Structural markers that were not found in the archive.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.has_openspec_dir {
            missing.push("openspec/".to_string());
        }
        if !self.has_changes_dir {
            missing.push("changes/".to_string());
        }
        if !self.has_specs_dir {
            missing.push("specs/".to_string());
        }
        if !self.has_project_md {
            missing.push("project.md".to_string());
        }
        missing
    }
}

/// Inspect the archive's entry names for the OpenSpec structural markers.
///
/// Never fails: an unreadable archive yields an invalid report carrying the
/// archive error.
pub fn validate(bytes: &[u8]) -> BundleReport {
    let names = match entry_names(bytes) {
        Ok(names) => names,
        Err(e) => {
            return BundleReport {
                errors: vec![e.to_string()],
                ..BundleReport::default()
            }
        }
    };

    let mut report = BundleReport::default();
    for name in &names {
        let lower = name.to_lowercase();
        if lower.starts_with("openspec") || lower.contains("openspec/") {
            report.has_openspec_dir = true;
        }
        if lower.contains("changes/") {
            report.has_changes_dir = true;
        }
        if lower.contains("specs/") {
            report.has_specs_dir = true;
        }
        // Any markdown document is accepted as project metadata.
        if lower.contains("project.md") || lower.ends_with(DOCUMENT_EXTENSION) {
            report.has_project_md = true;
        }
    }
    report.is_valid = report.has_openspec_dir
        || report.has_changes_dir
        || report.has_specs_dir
        || report.has_project_md;

    debug!(
        entries = names.len(),
        valid = report.is_valid,
        "bundle validated"
    );
    report
}

fn entry_names(bytes: &[u8]) -> Result<Vec<String>> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    Ok(archive.file_names().map(str::to_string).collect())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub content: String,
}

/// Read every markdown document out of the archive, sorted by path.
///
/// Fails with [`SpecflowError::BundleTooLarge`] as soon as one document or
/// the running total passes `limits`. Declared entry sizes are not trusted;
/// reads are capped.
pub fn extract(bytes: &[u8], limits: &Limits) -> Result<Vec<BundleEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let raw_path = file.name().replace('\\', "/");
        if file.is_dir() || is_skipped(&raw_path) {
            continue;
        }
        let path = raw_path.trim_matches('/').to_string();
        let Some(name) = path.rsplit('/').next().map(str::to_string) else {
            continue;
        };
        if !name.ends_with(DOCUMENT_EXTENSION) {
            continue;
        }

        if file.size() > limits.max_document_bytes {
            return Err(document_too_large(&path, limits));
        }
        let remaining = limits.max_bundle_bytes.saturating_sub(total);
        let cap = limits.max_document_bytes.min(remaining);
        let mut buf = Vec::new();
        file.by_ref().take(cap + 1).read_to_end(&mut buf)?;
        let read = buf.len() as u64;
        if read > limits.max_document_bytes {
            return Err(document_too_large(&path, limits));
        }
        if read > cap {
            return Err(SpecflowError::BundleTooLarge(format!(
                "documents exceed {} bytes in total",
                limits.max_bundle_bytes
            )));
        }
        total += read;

        let content = match String::from_utf8(buf) {
            Ok(s) => s,
            Err(_) => {
                warn!(path = %path, "skipping non-UTF-8 document");
                continue;
            }
        };

        entries.push(BundleEntry {
            kind: classify(&path),
            name,
            path,
            content,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn document_too_large(path: &str, limits: &Limits) -> SpecflowError {
    SpecflowError::BundleTooLarge(format!(
        "{path} exceeds {} bytes",
        limits.max_document_bytes
    ))
}

fn is_skipped(path: &str) -> bool {
    path.ends_with('/') || path.contains("__MACOSX") || path.starts_with('.')
}

/// `change` when any directory on the path is a `changes` area.
fn classify(path: &str) -> NodeKind {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    if segments.iter().any(|s| s.eq_ignore_ascii_case("changes")) {
        NodeKind::Change
    } else {
        NodeKind::Specification
    }
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

pub fn build_tree(entries: Vec<BundleEntry>, layout: Layout) -> Vec<SpecNode> {
    match layout {
        Layout::Flat => entries
            .into_iter()
            .map(|e| SpecNode::document(e.name, e.path, e.kind, e.content))
            .collect(),
        Layout::Nested => {
            let mut roots = Vec::new();
            for entry in entries {
                insert_nested(&mut roots, entry);
            }
            roots
        }
    }
}

fn insert_nested(roots: &mut Vec<SpecNode>, entry: BundleEntry) {
    let segments: Vec<&str> = entry.path.split('/').collect();
    let Some((_, dirs)) = segments.split_last() else {
        return;
    };

    let mut level = roots;
    let mut prefix = String::new();
    for dir in dirs {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(dir);

        let pos = match level.iter().position(|n| n.path == prefix) {
            Some(pos) => pos,
            None => {
                let kind = if dir.eq_ignore_ascii_case("changes") {
                    NodeKind::Change
                } else {
                    NodeKind::Directory
                };
                level.push(SpecNode::directory(*dir, prefix.clone(), kind));
                level.len() - 1
            }
        };
        level = &mut level[pos].children;
    }

    match level.iter_mut().find(|n| n.path == entry.path) {
        Some(existing) => existing.content = entry.content,
        None => level.push(SpecNode::document(
            entry.name,
            entry.path,
            NodeKind::Specification,
            entry.content,
        )),
    }
}

/// Validate, extract, and build in one step. Fails closed when the archive
/// carries none of the expected markers.
pub fn ingest(
    bytes: &[u8],
    layout: Layout,
    limits: &Limits,
) -> Result<(BundleReport, Vec<SpecNode>)> {
    let report = validate(bytes);
    if !report.is_valid {
        if let Some(err) = report.errors.first() {
            return Err(SpecflowError::Archive(err.clone()));
        }
        return Err(SpecflowError::InvalidBundle {
            missing: report.missing(),
        });
    }
    let entries = extract(bytes, limits)?;
    Ok((report, build_tree(entries, layout)))
}

/// Uploaded file names, when supplied, must carry the zip extension.
pub fn check_file_name(name: &str) -> Result<()> {
    if name.to_lowercase().ends_with(".zip") {
        Ok(())
    } else {
        Err(SpecflowError::Validation(format!(
            "file '{name}' must be a .zip file"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use crate::output::{print_json, print_table, tree_lines};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use specflow_core::bundle::{self, BundleReport, Layout, Limits};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum BundleSubcommand {
    /// Check an archive for the OpenSpec structural markers
    Validate {
        /// Path to the .zip bundle
        archive: PathBuf,
    },
    /// Show the specification tree an archive would produce
    Tree {
        /// Path to the .zip bundle
        archive: PathBuf,
        /// Build directory nodes from the archive paths
        #[arg(long)]
        nested: bool,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(subcommand: BundleSubcommand, json: bool) -> Result<()> {
    match subcommand {
        BundleSubcommand::Validate { archive } => validate(&archive, json),
        BundleSubcommand::Tree { archive, nested } => {
            let layout = if nested { Layout::Nested } else { Layout::Flat };
            tree(&archive, layout, json)
        }
    }
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    let name = path.to_string_lossy();
    bundle::check_file_name(&name)?;
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

fn print_report(report: &BundleReport) {
    let rows = vec![
        vec!["openspec/".to_string(), yes_no(report.has_openspec_dir)],
        vec!["changes/".to_string(), yes_no(report.has_changes_dir)],
        vec!["specs/".to_string(), yes_no(report.has_specs_dir)],
        vec!["project.md".to_string(), yes_no(report.has_project_md)],
    ];
    print_table(&["MARKER", "FOUND"], &rows);
    for err in &report.errors {
        println!("error: {err}");
    }
}

fn validate(path: &Path, json: bool) -> Result<()> {
    let bytes = read_archive(path)?;
    let report = bundle::validate(&bytes);
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    if !report.is_valid {
        bail!("{} is not a valid OpenSpec bundle", path.display());
    }
    if !json {
        println!("\n{} is a valid OpenSpec bundle", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

fn tree(path: &Path, layout: Layout, json: bool) -> Result<()> {
    let bytes = read_archive(path)?;
    let (_, nodes) = bundle::ingest(&bytes, layout, &Limits::default())?;
    if json {
        return print_json(&nodes);
    }
    if nodes.is_empty() {
        println!("(no specification documents)");
    }
    for line in tree_lines(&nodes) {
        println!("{line}");
    }
    Ok(())
}

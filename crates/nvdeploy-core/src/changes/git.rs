//! Read the list of changed paths between two revisions.

use std::path::Path;

use anyhow::Context;
use git2::{Delta, DiffOptions, Repository};

/// Revisions to compare. `base: None` means "first parent of head".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRange {
    pub base: Option<String>,
    pub head: String,
}

impl ChangeRange {
    pub fn new(base: Option<String>, head: impl Into<String>) -> Self {
        Self {
            base,
            head: head.into(),
        }
    }
}

impl Default for ChangeRange {
    fn default() -> Self {
        Self::new(None, "HEAD")
    }
}

/// List paths changed between `range.base` and `range.head`, relative to
/// `repo_path`.
///
/// `repo_path` may be a subdirectory of the git work tree; changes outside it
/// are dropped. A head commit without parents, or a base revision that cannot
/// be resolved, produces an empty change set instead of an error.
pub fn changed_paths(repo_path: &Path, range: &ChangeRange) -> anyhow::Result<Vec<String>> {
    let repo = Repository::discover(repo_path)
        .with_context(|| format!("Failed to open git repository at {}", repo_path.display()))?;
    let prefix = workdir_prefix(&repo, repo_path)?;

    let head = repo
        .revparse_single(&range.head)
        .and_then(|obj| obj.peel_to_commit())
        .with_context(|| format!("Failed to resolve head revision '{}'", range.head))?;

    let base = match &range.base {
        Some(reference) => match repo
            .revparse_single(reference)
            .and_then(|obj| obj.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(err) => {
                tracing::warn!(
                    base = %reference,
                    error = %err,
                    "Base revision not found; treating change set as empty"
                );
                return Ok(Vec::new());
            }
        },
        None => {
            if head.parent_count() == 0 {
                tracing::info!(head = %head.id(), "Head has no parent revision; no changes");
                return Ok(Vec::new());
            }
            head.parent(0)?
        }
    };

    let base_tree = base.tree()?;
    let head_tree = head.tree()?;
    let mut diff_opts = DiffOptions::new();
    diff_opts.include_typechange(true);

    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut diff_opts))?;

    let mut paths = Vec::new();
    for delta in diff.deltas() {
        let file = match delta.status() {
            Delta::Deleted => delta.old_file(),
            _ => delta.new_file(),
        };
        let Some(path) = file.path() else {
            continue;
        };
        let path = path.to_string_lossy().replace('\\', "/");
        match path.strip_prefix(prefix.as_str()) {
            Some(relative) => paths.push(relative.to_string()),
            None => tracing::trace!(path = %path, "Skipping change outside repository root"),
        }
    }

    tracing::debug!(
        base = %base.id(),
        head = %head.id(),
        count = paths.len(),
        "Collected changed paths"
    );
    Ok(paths)
}

/// Location of `repo_path` inside the work tree, as `sub/dir/`, or empty when
/// it is the work tree root.
fn workdir_prefix(repo: &Repository, repo_path: &Path) -> anyhow::Result<String> {
    let Some(workdir) = repo.workdir() else {
        return Ok(String::new());
    };
    let workdir = workdir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", workdir.display()))?;
    let target = repo_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", repo_path.display()))?;

    let relative = target.strip_prefix(&workdir).with_context(|| {
        format!(
            "{} is not inside the work tree {}",
            target.display(),
            workdir.display()
        )
    })?;

    let mut prefix = String::new();
    for component in relative.components() {
        prefix.push_str(&component.as_os_str().to_string_lossy());
        prefix.push('/');
    }
    Ok(prefix)
}

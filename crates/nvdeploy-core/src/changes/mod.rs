//! Change detection: which clusters does a revision touch?
//!
//! A cluster is affected when either of its two tracked files changed:
//! `<clusters_dir>/<name>/values.yaml` or `<clusters_dir>/<name>/env`.

pub mod git;

pub use git::{ChangeRange, changed_paths};

/// Files that mark a cluster as changed.
pub const TRACKED_FILES: [&str; 2] = ["values.yaml", "env"];

/// Strip surrounding whitespace, leading `./` and outer slashes, so that the
/// result can be compared against repository-relative diff paths.
pub fn normalize_clusters_dir(dir: &str) -> &str {
    let mut dir = dir.trim();
    while let Some(rest) = dir.strip_prefix("./") {
        dir = rest;
    }
    match dir.trim_matches('/') {
        "." => "",
        dir => dir,
    }
}

/// Extracts affected cluster names from a list of changed paths.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    clusters_dir: String,
}

impl ChangeDetector {
    pub fn new(clusters_dir: impl Into<String>) -> Self {
        let clusters_dir = clusters_dir.into();
        Self {
            clusters_dir: normalize_clusters_dir(&clusters_dir).to_string(),
        }
    }

    /// Return each affected cluster once, in the order it was first seen.
    pub fn detect<I, S>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clusters: Vec<String> = Vec::new();
        for path in paths {
            let Some(name) = self.cluster_for_path(path.as_ref()) else {
                continue;
            };
            if !clusters.iter().any(|c| c == name) {
                clusters.push(name.to_string());
            }
        }
        clusters
    }

    /// Return the cluster name if `path` is one of its tracked files.
    pub fn cluster_for_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = path.trim();
        let path = path.strip_prefix("./").unwrap_or(path);
        let rest = path
            .strip_prefix(self.clusters_dir.as_str())?
            .strip_prefix('/')?;
        let (name, file) = rest.split_once('/')?;

        if name.is_empty() || !TRACKED_FILES.contains(&file) {
            return None;
        }
        Some(name)
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new("clusters")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_values_and_env_changes() {
        let detector = ChangeDetector::default();
        let clusters = detector.detect([
            "clusters/prod-eks-01/values.yaml",
            "clusters/staging-k3s-01/env",
        ]);
        assert_eq!(clusters, vec!["prod-eks-01", "staging-k3s-01"]);
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let detector = ChangeDetector::default();
        let clusters = detector.detect([
            "clusters/b/env",
            "clusters/a/values.yaml",
            "clusters/b/values.yaml",
            "clusters/a/env",
        ]);
        assert_eq!(clusters, vec!["b", "a"]);
    }

    #[test]
    fn ignores_unrelated_paths() {
        let detector = ChangeDetector::default();
        let clusters = detector.detect([
            "README.md",
            "clusters/a/README.md",
            "clusters/a/nested/values.yaml",
            "clusters//env",
            "clusters/values.yaml",
            "other/clusters/a/env",
            "clusters/a/env.bak",
            "clustersx/a/env",
        ]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn ignores_empty_sentinel_and_blank_entries() {
        let detector = ChangeDetector::default();
        let clusters = detector.detect(["", "   ", "clusters/a/env"]);
        assert_eq!(clusters, vec!["a"]);
    }

    #[test]
    fn empty_change_set_yields_nothing() {
        let detector = ChangeDetector::default();
        let clusters = detector.detect(Vec::<String>::new());
        assert!(clusters.is_empty());
    }

    #[test]
    fn tolerates_leading_dot_slash() {
        let detector = ChangeDetector::default();
        assert_eq!(detector.cluster_for_path("./clusters/a/env"), Some("a"));
    }

    #[test]
    fn honors_custom_clusters_dir() {
        let detector = ChangeDetector::new("deploy/clusters/");
        assert_eq!(
            detector.cluster_for_path("deploy/clusters/edge-1/values.yaml"),
            Some("edge-1")
        );
        assert_eq!(detector.cluster_for_path("clusters/edge-1/values.yaml"), None);
    }

    #[test]
    fn normalizes_dot_slash_clusters_dir() {
        let detector = ChangeDetector::new("./clusters");
        assert_eq!(detector.detect(["clusters/a/env"]), vec!["a"]);
        assert_eq!(detector.cluster_for_path("./clusters/b/values.yaml"), Some("b"));
    }
}

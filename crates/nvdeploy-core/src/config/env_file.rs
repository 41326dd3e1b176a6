//! Parser for the per-cluster `env` file.
//!
//! The format is a small subset of shell-style assignments:
//!
//! ```text
//! # comment
//! HELM_CHART_VERSION=5.3.0
//! NAMESPACE="neuvector"
//! RELEASE_NAME='neuvector'
//! ```
//!
//! Parsing never fails: lines without `=` are dropped, and a later
//! assignment to the same key replaces an earlier one.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

/// Key/value pairs read from a cluster's `env` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    values: HashMap<String, String>,
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse env-file content.
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            values.insert(
                key.trim().to_string(),
                strip_matching_quotes(value.trim()).to_string(),
            );
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Read and parse an env file.
pub fn load_env_file(path: &Path) -> anyhow::Result<ClusterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file: {}", path.display()))?;
    Ok(ClusterConfig::parse(&content))
}

/// Remove one layer of `"..."` or `'...'` when both ends use the same quote.
fn strip_matching_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_mixed_content() {
        let config = ClusterConfig::parse("FOO=bar\n# comment\n\nBAZ='qux'\nBROKEN_LINE");

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("FOO"), Some("bar"));
        assert_eq!(config.get("BAZ"), Some("qux"));
        assert_eq!(config.get("BROKEN_LINE"), None);
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let config = ClusterConfig::parse(r#"KEY="a=b""#);
        assert_eq!(config.get("KEY"), Some("a=b"));

        let config = ClusterConfig::parse("URL=https://host/?x=1&y=2");
        assert_eq!(config.get("URL"), Some("https://host/?x=1&y=2"));
    }

    #[test]
    fn test_parse_mismatched_quotes_are_kept() {
        let config = ClusterConfig::parse(r#"KEY="abc'"#);
        assert_eq!(config.get("KEY"), Some(r#""abc'"#));
    }

    #[test]
    fn test_parse_strips_only_one_layer() {
        let config = ClusterConfig::parse(r#"KEY=""nested"""#);
        assert_eq!(config.get("KEY"), Some(r#""nested""#));
    }

    #[test]
    fn test_parse_single_quote_char_is_not_stripped() {
        let config = ClusterConfig::parse("KEY=\"");
        assert_eq!(config.get("KEY"), Some("\""));

        let config = ClusterConfig::parse("KEY=''");
        assert_eq!(config.get("KEY"), Some(""));
    }

    #[test]
    fn test_parse_trims_key_and_value() {
        let config = ClusterConfig::parse("   NAMESPACE  =   security  \n\t# indented comment");
        assert_eq!(config.get("NAMESPACE"), Some("security"));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_parse_trims_before_quote_stripping() {
        let config = ClusterConfig::parse("RELEASE_NAME =  ' nv '  ");
        assert_eq!(config.get("RELEASE_NAME"), Some(" nv "));
    }

    #[test]
    fn test_parse_last_assignment_wins() {
        let config = ClusterConfig::parse("NAMESPACE=first\nNAMESPACE=second");
        assert_eq!(config.get("NAMESPACE"), Some("second"));
    }

    #[test]
    fn test_parse_empty_key_and_value() {
        let config = ClusterConfig::parse("=value\nEMPTY=");
        assert_eq!(config.get(""), Some("value"));
        assert_eq!(config.get("EMPTY"), Some(""));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let content = "A=1\nB='2'\n# c\nD=\"x=y\"\nnoise\n";
        assert_eq!(ClusterConfig::parse(content), ClusterConfig::parse(content));
    }

    #[test]
    fn test_parse_handles_crlf() {
        let config = ClusterConfig::parse("DRY_RUN=true\r\nNAMESPACE=nv\r\n");
        assert_eq!(config.get("DRY_RUN"), Some("true"));
        assert_eq!(config.get("NAMESPACE"), Some("nv"));
    }

    #[test]
    fn test_load_env_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "HELM_CHART_VERSION=5.3.0\nUNKNOWN=kept").unwrap();

        let config = load_env_file(temp_file.path()).unwrap();
        assert_eq!(config.get("HELM_CHART_VERSION"), Some("5.3.0"));
        assert_eq!(config.get("UNKNOWN"), Some("kept"));
    }

    #[test]
    fn test_load_nonexistent_env_file() {
        let result = load_env_file(Path::new("/nonexistent/clusters/x/env"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read env file")
        );
    }
}

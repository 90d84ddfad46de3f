//! Run artifacts: JSON, HTML and Prometheus text exposition
//!
//! Every renderer is a pure function of its input reports; only
//! [`write_artifact`] touches the filesystem.

pub mod exposition;
pub mod html;
pub mod json;

pub use exposition::render_exposition;
pub use html::{render_comparison_html, render_run_html, NOT_AVAILABLE};
pub use json::{from_json, to_json};

use crate::error::{BenchError, Result};
use std::path::Path;

/// Write an artifact, creating missing parent directories
///
/// On failure the error names the path that could not be written; the
/// caller's in-memory report is untouched and can be written elsewhere.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| BenchError::WriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, contents).map_err(|source| BenchError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_artifact_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results").join("docker").join("run.json");

        write_artifact(&path, "{}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_artifact_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file cannot act as a directory
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("run.json");

        let err = write_artifact(&path, "{}").unwrap_err();
        match err {
            BenchError::WriteFailed { path: failed, .. } => assert!(failed.starts_with(&blocker)),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

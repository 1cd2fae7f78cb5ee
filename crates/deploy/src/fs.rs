//! File system utils.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

pub struct FsHandler;

impl FsHandler {
    /// Create a directory and its parents if it doesn't exist.
    pub fn create_dir(path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        tracing::trace!(path = %path.display(), "Directory ready");
        Ok(())
    }

    /// Write `value` as pretty JSON, creating the parent directory first.
    pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            Self::create_dir(parent)?;
        }

        let content = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;

        // Readers never observe a partially written record.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_write_json_creates_parents() {
        let tmp = TempDir::new("zeyphr-fs").unwrap();
        let path = tmp.path().join("a/b/value.json");

        FsHandler::write_json(&path, &serde_json::json!({"answer": 42})).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["answer"], 42);
        assert!(!path.with_extension("json.tmp").exists());
    }
}

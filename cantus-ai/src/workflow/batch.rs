//! Batch file I/O
//!
//! The batch file is a JSON array of raw records, read in full before
//! orchestration begins.

use crate::error::BatchLoadError;
use crate::types::RawRecord;
use std::path::Path;
use tracing::info;

/// Read and parse a batch file
pub async fn load_batch(path: &Path) -> Result<Vec<RawRecord>, BatchLoadError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BatchLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let records: Vec<RawRecord> =
        serde_json::from_str(&content).map_err(|source| BatchLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    info!(count = records.len(), path = %path.display(), "Loaded batch");
    Ok(records)
}

/// Write records as a pretty-printed JSON array, creating parent directories
pub async fn save_batch(path: &Path, records: &[RawRecord]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json).await?;

    info!(count = records.len(), path = %path.display(), "Saved batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("music_metadata.json");

        let mut record = RawRecord::new("music_1", "Magnificat", "Johann Sebastian Bach");
        record.attributes = vec!["Key: D major".to_string()];
        save_batch(&path, &[record.clone()]).await.unwrap();

        let loaded = load_batch(&path).await.unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[tokio::test]
    async fn test_saved_file_omits_absent_optionals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("music_metadata.json");
        save_batch(&path, &[RawRecord::new("music_5", "Motet", "Heinrich Schütz")])
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("\"type\""));
        assert!(!written.contains("\"language\""));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_batch(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, BatchLoadError::Read { .. }));
    }

    #[tokio::test]
    async fn test_not_an_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"objectID": "x"}"#).unwrap();

        let err = load_batch(&path).await.unwrap_err();
        assert!(matches!(err, BatchLoadError::Parse { .. }));
    }
}

//! Persist-back collaborator: overwrites a dataset file with enriched records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use geolist_core::{DataFormat, Record};
use geolist_ingest::write_delimited;
use serde_json::Value;

use crate::error::EnrichError;

#[async_trait]
pub trait Persister: Send + Sync {
    /// Replaces the file at `target` with `records`, minus `omit` fields.
    async fn save(&self, records: &[Record], target: &Path, omit: &[String])
        -> Result<(), EnrichError>;
}

/// Writes CSV or JSON by the target's extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePersister;

#[async_trait]
impl Persister for FilePersister {
    async fn save(
        &self,
        records: &[Record],
        target: &Path,
        omit: &[String],
    ) -> Result<(), EnrichError> {
        let path = target.display().to_string();
        let body = match DataFormat::from_path(&path) {
            DataFormat::Csv => write_delimited(records, omit),
            DataFormat::Json => render_json(records, omit, &path)?,
        };

        // Write next to the target, then rename over it.
        let tmp = temp_path(target);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| EnrichError::Persist {
                path: tmp.display().to_string(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, target)
            .await
            .map_err(|e| EnrichError::Persist {
                path: path.clone(),
                source: e,
            })?;

        tracing::info!(path = %path, records = records.len(), "persisted dataset");
        Ok(())
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn render_json(records: &[Record], omit: &[String], path: &str) -> Result<String, EnrichError> {
    let rows: Vec<Value> = records
        .iter()
        .map(|record| {
            Value::Object(
                record
                    .iter()
                    .filter(|(k, _)| !omit.iter().any(|o| o == *k))
                    .map(|(k, v)| (k.to_owned(), v.clone()))
                    .collect(),
            )
        })
        .collect();
    serde_json::to_string_pretty(&rows).map_err(|e| EnrichError::Serialize {
        path: path.to_owned(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use geolist_ingest::parse_delimited;

    use super::*;

    #[tokio::test]
    async fn csv_target_is_replaced_without_omitted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("visits.csv");
        std::fs::write(&target, "old,content\n1,2\n").unwrap();

        let mut record = Record::from_pairs([("Team", "Ravens"), ("Email", "a@b.org")]);
        record.insert("latitude", 33.95);
        FilePersister
            .save(&[record], &target, &["Email".to_owned()])
            .await
            .unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        let rows = parse_delimited(&written, ',');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("latitude").as_deref(), Some("33.95"));
        assert!(!rows[0].contains_key("Email"));
        assert!(!dir.path().join("visits.csv.tmp").exists());
    }

    #[tokio::test]
    async fn json_target_keeps_value_types() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("parks.json");
        let mut record = Record::from_pairs([("Name", "Stone Mountain")]);
        record.insert("latitude", 33.81);

        FilePersister.save(&[record], &target, &[]).await.unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(written[0]["latitude"], serde_json::json!(33.81));
    }

    #[tokio::test]
    async fn missing_directory_is_a_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nope").join("x.csv");
        let err = FilePersister.save(&[], &target, &[]).await.unwrap_err();
        assert!(matches!(err, EnrichError::Persist { .. }));
    }
}

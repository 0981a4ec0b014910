//! Dated snapshots of telemetry documents plus the manifest the
//! dashboard's history picker reads.

use crate::document::TelemetryDocument;
use crate::error::{Result, TelemetryError};
use crate::types::DataSource;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// `YYYY-MM-DD`, also the snapshot file stem
    pub id: String,
    /// Human label, e.g. `Oct 16, 2026`
    pub label: String,
    /// Original ISO-8601 timestamp
    pub date: String,
    pub matches: usize,
    pub description: String,
    pub source: DataSource,
}

pub struct SnapshotArchive {
    archive_dir: PathBuf,
    manifest_path: PathBuf,
}

impl SnapshotArchive {
    pub fn new(archive_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            manifest_path: manifest_path.into(),
        }
    }

    pub fn snapshot_path(&self, id: &str) -> PathBuf {
        self.archive_dir.join(format!("{id}.json"))
    }

    /// Archive the document stored at `input`
    pub fn archive_file(&self, input: impl AsRef<Path>) -> Result<SnapshotEntry> {
        let document = TelemetryDocument::read_from(input)?;
        self.archive(&document)
    }

    /// Write the dated snapshot and upsert its manifest entry (newest first)
    pub fn archive(&self, document: &TelemetryDocument) -> Result<SnapshotEntry> {
        let metadata = document.metadata.as_ref().ok_or(TelemetryError::MissingTimestamp)?;
        let timestamp = metadata.timestamp().ok_or(TelemetryError::MissingTimestamp)?;
        let fetched = parse_timestamp(timestamp)?.with_timezone(&Utc);

        let id = fetched.format("%Y-%m-%d").to_string();
        let entry = SnapshotEntry {
            id: id.clone(),
            label: fetched.format("%b %-d, %Y").to_string(),
            date: timestamp.to_string(),
            matches: document.matches.len(),
            description: format!("Snapshot from {id}"),
            source: metadata.source,
        };

        let mut snapshots = self.load_manifest();
        snapshots.retain(|s| s.id != entry.id);
        snapshots.push(entry.clone());
        sort_newest_first(&mut snapshots);

        let snapshot_path = self.snapshot_path(&id);
        let previous = std::fs::read(&snapshot_path).ok();
        if previous.is_some() {
            tracing::warn!(path = %snapshot_path.display(), "Snapshot already exists, overwriting");
        }
        document.write_to(&snapshot_path)?;

        // Snapshot and manifest land together or not at all
        if let Err(e) = self.write_manifest(&snapshots) {
            let restored = match &previous {
                Some(bytes) => std::fs::write(&snapshot_path, bytes),
                None => std::fs::remove_file(&snapshot_path),
            };
            if let Err(restore_err) = restored {
                tracing::error!(path = %snapshot_path.display(), error = %restore_err, "Failed to roll back snapshot");
            }
            return Err(e);
        }

        tracing::info!(
            snapshot = %snapshot_path.display(),
            matches = document.matches.len(),
            total = snapshots.len(),
            "Archived snapshot"
        );
        Ok(entry)
    }

    /// Current manifest; missing or unreadable manifests start over empty
    pub fn load_manifest(&self) -> Vec<SnapshotEntry> {
        let json = match std::fs::read_to_string(&self.manifest_path) {
            Ok(json) => json,
            Err(_) => return Vec::new(),
        };

        serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unreadable snapshots manifest, creating a new one");
            Vec::new()
        })
    }

    fn write_manifest(&self, snapshots: &[SnapshotEntry]) -> Result<()> {
        if let Some(parent) = self.manifest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TelemetryError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(snapshots)?;
        std::fs::write(&self.manifest_path, json).map_err(|e| TelemetryError::io(&self.manifest_path, e))
    }
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(timestamp).map_err(|_| TelemetryError::InvalidTimestamp(timestamp.to_string()))
}

/// Entries with unparsable dates sink to the end
fn sort_newest_first(snapshots: &mut [SnapshotEntry]) {
    snapshots.sort_by_key(|s| std::cmp::Reverse(parse_timestamp(&s.date).ok()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TelemetryMetadata;
    use crate::generator::TelemetryGenerator;
    use crate::types::{GeneratorConfig, Meta};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn real_document(fetched_at: &str, matches: usize) -> TelemetryDocument {
        let generator = TelemetryGenerator::new(Meta::default(), GeneratorConfig::default()).unwrap();
        TelemetryDocument {
            matches: generator.generate_matches(matches, &mut StdRng::seed_from_u64(3)),
            metadata: Some(TelemetryMetadata {
                source: DataSource::Real,
                generated_at: None,
                fetched_at: Some(fetched_at.to_string()),
                match_count: matches,
                api_version: Some("v1".to_string()),
            }),
            version: None,
        }
    }

    fn archive_in(dir: &Path) -> SnapshotArchive {
        SnapshotArchive::new(dir.join("data/archive"), dir.join("data/snapshots.json"))
    }

    #[test]
    fn test_archive_writes_snapshot_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());

        let entry = archive.archive(&real_document("2026-10-16T08:30:00.000Z", 4)).unwrap();
        assert_eq!(entry.id, "2026-10-16");
        assert_eq!(entry.label, "Oct 16, 2026");
        assert_eq!(entry.description, "Snapshot from 2026-10-16");
        assert_eq!(entry.matches, 4);
        assert_eq!(entry.source, DataSource::Real);

        let snapshot = TelemetryDocument::read_from(archive.snapshot_path("2026-10-16")).unwrap();
        assert_eq!(snapshot.matches.len(), 4);
        assert_eq!(archive.load_manifest(), vec![entry]);
    }

    #[test]
    fn test_manifest_replaces_same_day_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());

        archive.archive(&real_document("2026-09-01T10:00:00Z", 2)).unwrap();
        archive.archive(&real_document("2026-10-02T10:00:00Z", 3)).unwrap();
        archive.archive(&real_document("2026-09-01T18:00:00Z", 5)).unwrap();

        let manifest = archive.load_manifest();
        let ids: Vec<&str> = manifest.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["2026-10-02", "2026-09-01"]);
        assert_eq!(manifest[1].matches, 5);
    }

    #[test]
    fn test_corrupt_manifest_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/snapshots.json"), "not json").unwrap();

        archive.archive(&real_document("2026-10-16T08:30:00Z", 1)).unwrap();
        assert_eq!(archive.load_manifest().len(), 1);
    }

    #[test]
    fn test_document_without_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());

        let err = archive.archive(&TelemetryDocument::mock(Vec::new())).unwrap_err();
        assert!(matches!(err, TelemetryError::MissingTimestamp));

        let err = archive.archive(&real_document("yesterday", 1)).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_failed_manifest_write_leaves_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("snapshots.json");
        std::fs::create_dir_all(&manifest).unwrap();
        let archive = SnapshotArchive::new(dir.path().join("archive"), &manifest);

        assert!(archive.archive(&real_document("2026-10-16T08:30:00Z", 2)).is_err());
        assert!(!archive.snapshot_path("2026-10-16").exists());
    }

    #[test]
    fn test_failed_manifest_write_restores_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());
        archive.archive(&real_document("2026-10-16T08:30:00Z", 2)).unwrap();

        let manifest = dir.path().join("data/snapshots.json");
        std::fs::remove_file(&manifest).unwrap();
        std::fs::create_dir_all(&manifest).unwrap();

        assert!(archive.archive(&real_document("2026-10-16T20:00:00Z", 6)).is_err());
        let kept = TelemetryDocument::read_from(archive.snapshot_path("2026-10-16")).unwrap();
        assert_eq!(kept.matches.len(), 2);
    }

    #[test]
    fn test_archived_input_without_source_counts_as_real() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("real_telemetry.json");
        std::fs::write(
            &input,
            r#"{"matches": [], "metadata": {"fetched_at": "2026-10-01T12:00:00Z", "match_count": 0}}"#,
        )
        .unwrap();

        let entry = archive_in(dir.path()).archive_file(&input).unwrap();
        assert_eq!(entry.source, DataSource::Real);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_in(dir.path());
        assert!(archive.archive_file(dir.path().join("real_telemetry.json")).is_err());
    }
}

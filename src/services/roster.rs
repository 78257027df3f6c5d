//! Roster persistence: participant records that survive restarts.

use std::path::{Path, PathBuf};

use crate::core::ParticipantRecord;
use crate::error::Result;

/// Durable store of participant registrations.
pub trait RosterStore: Send + Sync {
    fn load(&self) -> Result<Vec<ParticipantRecord>>;

    /// Insert or replace the record with the same identity.
    fn save(&self, record: &ParticipantRecord) -> Result<()>;
}

/// Roster kept as a pretty-printed JSON array.
pub struct JsonRoster {
    path: PathBuf,
}

impl JsonRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterStore for JsonRoster {
    fn load(&self) -> Result<Vec<ParticipantRecord>> {
        if !self.path.exists() {
            tracing::debug!("No roster at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let records: Vec<ParticipantRecord> = serde_json::from_str(&content)?;
        tracing::debug!("Loaded {} roster records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn save(&self, record: &ParticipantRecord) -> Result<()> {
        let mut records = self.load()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, content)?;

        tracing::info!("Saved roster record for {}", record.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CourseCode, MemberId};
    use tempfile::TempDir;

    fn record(id: u64, first: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: MemberId(id),
            first_name: first.to_string(),
            last_name: "Lovelace".to_string(),
            student_id: format!("S{}", id),
            course: Some(CourseCode::new("EGR222")),
            degree: "Trad".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let roster = JsonRoster::new(dir.path().join("roster.json"));
        assert!(roster.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_same_identity() {
        let dir = TempDir::new().unwrap();
        let roster = JsonRoster::new(dir.path().join("nested").join("roster.json"));

        roster.save(&record(1, "Ada")).unwrap();
        roster.save(&record(2, "Grace")).unwrap();
        roster.save(&record(1, "Augusta")).unwrap();

        let records = roster.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first_name, "Augusta");
        assert_eq!(records[1].id, MemberId(2));
    }
}

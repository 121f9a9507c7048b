//! Append-only version history of a report definition

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::report::ReportConfig;

/// One immutable saved snapshot
#[derive(Debug, Clone)]
pub struct ReportVersion {
    pub number: u32,
    pub saved_at: DateTime<Utc>,
    pub note: Option<String>,
    pub snapshot: Arc<ReportConfig>,
}

/// Saved versions of one report, oldest first
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    versions: Vec<ReportVersion>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a new version; the snapshot's `version` is stamped with the assigned number
    pub fn save(&mut self, mut config: ReportConfig, saved_at: DateTime<Utc>, note: Option<String>) -> &ReportVersion {
        let number = self.versions.last().map_or(1, |v| v.number + 1);
        config.version = number;
        tracing::debug!("Saving report '{}' as version {}", config.id, number);

        self.versions.push(ReportVersion {
            number,
            saved_at,
            note,
            snapshot: Arc::new(config),
        });
        &self.versions[self.versions.len() - 1]
    }

    pub fn latest(&self) -> Option<&ReportVersion> {
        self.versions.last()
    }

    pub fn get(&self, number: u32) -> Option<&ReportVersion> {
        self.versions.iter().find(|v| v.number == number)
    }

    pub fn versions(&self) -> &[ReportVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_save_assigns_increasing_numbers() {
        let mut history = VersionHistory::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let mut config = ReportConfig::new("r", "Report");
        config.version = 42;
        assert_eq!(history.save(config.clone(), at, None).number, 1);

        config.name = "Renamed".to_string();
        let second = history.save(config, at, Some("rename".to_string()));
        assert_eq!(second.number, 2);
        assert_eq!(second.snapshot.version, 2);

        let first = history.get(1).unwrap();
        assert_eq!(first.snapshot.name, "Report");
        assert_eq!(first.snapshot.version, 1);
        assert_eq!(history.latest().unwrap().snapshot.name, "Renamed");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_snapshots_are_shared() {
        let mut history = VersionHistory::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        history.save(ReportConfig::new("r", "Report"), at, None);

        let snapshot = Arc::clone(&history.latest().unwrap().snapshot);
        assert_eq!(Arc::strong_count(&snapshot), 2);
    }
}

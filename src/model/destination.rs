//! Destination bindings: where a report is delivered and with which overrides
//!
//! Destinations themselves (connection details, credentials) live with an
//! external collaborator; a binding only references one by id.

use serde::{Deserialize, Serialize};

use super::schedule::ScheduleOverride;

fn default_true() -> bool {
    true
}

/// Transport-specific overrides. Text fields may carry filename tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportOverrides {
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        cc: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bcc: Vec<String>,
    },
    S3 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_prefix: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage_class: Option<String>,
    },
    Sftp {
        #[serde(default)]
        overwrite_existing: bool,
    },
}

/// Attachment of a report to one delivery destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationBinding {
    pub destination_id: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides the report's filename pattern when non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_pattern: Option<String>,

    /// Directory template below the destination root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,

    #[serde(default = "default_true")]
    pub use_default_schedule: bool,

    /// Only consulted when `use_default_schedule` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_schedule: Option<ScheduleOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<TransportOverrides>,
}

impl DestinationBinding {
    pub fn new(destination_id: impl Into<String>) -> Self {
        Self {
            destination_id: destination_id.into(),
            enabled: true,
            filename_pattern: None,
            subdirectory: None,
            use_default_schedule: true,
            custom_schedule: None,
            delay_minutes: None,
            overrides: None,
        }
    }

    pub fn with_custom_schedule(mut self, schedule: ScheduleOverride) -> Self {
        self.use_default_schedule = false;
        self.custom_schedule = Some(schedule);
        self
    }

    pub fn with_delay(mut self, minutes: u32) -> Self {
        self.delay_minutes = Some(minutes);
        self
    }

    pub fn with_filename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.filename_pattern = Some(pattern.into());
        self
    }

    /// The binding's own pattern, if one is set and non-empty
    pub fn pattern_override(&self) -> Option<&str> {
        self.filename_pattern.as_deref().filter(|p| !p.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_binding_defaults() {
        let binding: DestinationBinding =
            serde_json::from_str(r#"{"destination_id": "regulator-sftp"}"#).unwrap();
        assert!(binding.enabled);
        assert!(binding.use_default_schedule);
        assert!(binding.custom_schedule.is_none());
        assert_eq!(binding.delay_minutes, None);
    }

    #[test]
    fn test_deserialize_transport_overrides() {
        let binding: DestinationBinding = serde_json::from_str(
            r#"{
                "destination_id": "ops-mail",
                "overrides": {"transport": "email", "subject": "{report_name} {date}", "cc": ["ops@example.com"]}
            }"#,
        )
        .unwrap();
        match binding.overrides {
            Some(TransportOverrides::Email { subject, cc, bcc }) => {
                assert_eq!(subject.as_deref(), Some("{report_name} {date}"));
                assert_eq!(cc, vec!["ops@example.com".to_string()]);
                assert!(bcc.is_empty());
            }
            other => panic!("unexpected overrides {:?}", other),
        }
    }

    #[test]
    fn test_blank_pattern_is_not_an_override() {
        let binding = DestinationBinding::new("d").with_filename_pattern("  ");
        assert_eq!(binding.pattern_override(), None);
    }
}

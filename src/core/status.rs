//! Stage outcome shared by every stage response

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall outcome of one stage invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// The stage ran; individual tables may still have failed
    Success,
    /// There was nothing to do
    Skipped,
    /// Every attempted table failed
    Error,
}

impl StageStatus {
    /// Status for a stage that attempted `attempted` tables and saw `failed` of them fail
    pub fn from_counts(attempted: usize, failed: usize) -> Self {
        if failed > 0 && failed >= attempted {
            StageStatus::Error
        } else {
            StageStatus::Success
        }
    }

    /// Notification subject for a stage that finished with this status
    pub fn notification_subject(self, stage: &str) -> String {
        match self {
            StageStatus::Error => format!("{stage} Failed"),
            StageStatus::Success | StageStatus::Skipped => format!("{stage} Success"),
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Success => f.write_str("success"),
            StageStatus::Skipped => f.write_str("skipped"),
            StageStatus::Error => f.write_str("error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_subject_follows_status() {
        assert_eq!(StageStatus::Success.notification_subject("Ingestion"), "Ingestion Success");
        assert_eq!(StageStatus::Error.notification_subject("Ingestion"), "Ingestion Failed");
        assert_eq!(StageStatus::Error.notification_subject("Load"), "Load Failed");
    }

    #[test]
    fn test_from_counts() {
        assert_eq!(StageStatus::from_counts(0, 0), StageStatus::Success);
        assert_eq!(StageStatus::from_counts(3, 1), StageStatus::Success);
        assert_eq!(StageStatus::from_counts(2, 2), StageStatus::Error);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StageStatus::Skipped).unwrap(),
            "\"skipped\""
        );
    }
}

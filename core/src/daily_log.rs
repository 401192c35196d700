//! Daily hygiene and lab-test photo logs.
//!
//! One row per `(kind, date, area)`. For lab tests `area` holds the test name.

use crate::error::{CoreError, CoreResult};
use crate::package::non_blank;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    Hygiene,
    LabTest,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Hygiene => "HYGIENE",
            LogKind::LabTest => "LAB_TEST",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HYGIENE" => Ok(LogKind::Hygiene),
            "LAB_TEST" => Ok(LogKind::LabTest),
            other => Err(CoreError::Validation(format!("unknown log kind: {other}"))),
        }
    }
}

/// A submitted log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLogEntry {
    pub kind: LogKind,
    pub date: NaiveDate,
    pub area: String,
    pub photo_url: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

impl DailyLogEntry {
    /// Validate and stamp the entry. `recorded_by` comes from the session.
    pub fn into_log(self, recorded_by: Option<String>, now: DateTime<Utc>) -> CoreResult<DailyLog> {
        let area = self.area.trim().to_string();
        if area.is_empty() {
            return Err(CoreError::Validation("area must not be empty".into()));
        }
        let photo_url = self.photo_url.trim().to_string();
        if photo_url.is_empty() {
            return Err(CoreError::Validation("photo_url must not be empty".into()));
        }
        Ok(DailyLog {
            kind: self.kind,
            date: self.date,
            area,
            photo_url,
            notes: non_blank(self.notes),
            result: non_blank(self.result),
            recorded_by: non_blank(recorded_by),
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    pub kind: LogKind,
    pub date: NaiveDate,
    pub area: String,
    pub photo_url: String,
    pub notes: Option<String>,
    pub result: Option<String>,
    pub recorded_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DailyLog {
    /// Conflict key for upserts.
    pub fn key(&self) -> (LogKind, NaiveDate, String) {
        (self.kind, self.date, self.area.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLogQuery {
    #[serde(default)]
    pub kind: Option<LogKind>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl DailyLogQuery {
    pub fn matches(&self, log: &DailyLog) -> bool {
        self.kind.is_none_or(|k| log.kind == k) && self.date.is_none_or(|d| log.date == d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_requires_area_and_photo() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let entry = DailyLogEntry {
            kind: LogKind::Hygiene,
            date,
            area: "Packing floor".into(),
            photo_url: " ".into(),
            notes: None,
            result: None,
        };
        assert!(entry.clone().into_log(None, Utc::now()).is_err());

        let log = DailyLogEntry {
            photo_url: "https://cdn.example/p/1.jpg".into(),
            ..entry
        }
        .into_log(Some("supervisor".into()), Utc::now())
        .unwrap();
        assert_eq!(log.key(), (LogKind::Hygiene, date, "Packing floor".to_string()));
        assert_eq!(log.recorded_by.as_deref(), Some("supervisor"));
    }

    #[test]
    fn test_kind_parses_from_wire_names() {
        assert_eq!("lab_test".parse::<LogKind>().unwrap(), LogKind::LabTest);
        assert!("audit".parse::<LogKind>().is_err());
    }
}

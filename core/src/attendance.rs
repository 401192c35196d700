//! Worker attendance bookkeeping.
//!
//! One row per `(worker_name, date)`; writing the same pair again replaces it.

use crate::error::{CoreError, CoreResult};
use crate::package::non_blank;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Leave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::HalfDay => "HALF_DAY",
            AttendanceStatus::Leave => "LEAVE",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            "HALF_DAY" => Ok(AttendanceStatus::HalfDay),
            "LEAVE" => Ok(AttendanceStatus::Leave),
            other => Err(CoreError::Validation(format!(
                "unknown attendance status: {other}"
            ))),
        }
    }
}

/// A submitted attendance entry, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub worker_name: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub check_in: Option<NaiveTime>,
    #[serde(default)]
    pub check_out: Option<NaiveTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AttendanceEntry {
    /// Validate the entry and stamp it into a storable record.
    pub fn into_record(self, now: DateTime<Utc>) -> CoreResult<AttendanceRecord> {
        let worker_name = self.worker_name.trim().to_string();
        if worker_name.is_empty() {
            return Err(CoreError::Validation("worker_name must not be empty".into()));
        }
        if let (Some(check_in), Some(check_out)) = (self.check_in, self.check_out) {
            if check_out < check_in {
                return Err(CoreError::Validation(format!(
                    "check_out {check_out} is before check_in {check_in}"
                )));
            }
        }
        Ok(AttendanceRecord {
            worker_name,
            date: self.date,
            status: self.status,
            check_in: self.check_in,
            check_out: self.check_out,
            notes: non_blank(self.notes),
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub worker_name: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Conflict key for upserts.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.worker_name.clone(), self.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub worker: Option<String>,
}

impl AttendanceQuery {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.date.is_none_or(|d| record.date == d)
            && self
                .worker
                .as_deref()
                .is_none_or(|w| record.worker_name == w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AttendanceEntry {
        AttendanceEntry {
            worker_name: "  Ravi ".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            status: AttendanceStatus::Present,
            check_in: NaiveTime::from_hms_opt(9, 0, 0),
            check_out: NaiveTime::from_hms_opt(17, 30, 0),
            notes: Some(" ".into()),
        }
    }

    #[test]
    fn test_entry_is_trimmed_and_stamped() {
        let now = Utc::now();
        let record = entry().into_record(now).unwrap();
        assert_eq!(record.worker_name, "Ravi");
        assert_eq!(record.notes, None);
        assert_eq!(record.updated_at, now);
    }

    #[test]
    fn test_check_out_before_check_in_is_rejected() {
        let mut bad = entry();
        bad.check_out = NaiveTime::from_hms_opt(8, 0, 0);
        assert!(matches!(
            bad.into_record(Utc::now()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_status_parses_from_wire_names() {
        assert_eq!(
            "half_day".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::HalfDay
        );
        assert!("sick".parse::<AttendanceStatus>().is_err());
        let json = serde_json::to_string(&AttendanceStatus::HalfDay).unwrap();
        assert_eq!(json, "\"HALF_DAY\"");
    }
}

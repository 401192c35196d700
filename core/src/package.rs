//! Package records, status updates and list queries.

use crate::error::{CoreError, CoreResult};
use crate::guard::check_transition;
use crate::status::PackageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A tracked package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub code: String,
    pub status: PackageStatus,
    /// Set when the package is packed.
    pub weight: Option<String>,
    /// Set when the package is packed.
    pub packer_name: Option<String>,
    /// Set when the package is dispatched.
    pub shipping_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageRecord {
    /// A freshly generated, `PENDING` package.
    pub fn new(code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            status: PackageStatus::Pending,
            weight: None,
            packer_name: None,
            shipping_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge an accepted update into the record.
    ///
    /// Does not consult the guard; callers run [`check_transition`] first.
    /// Pack details are only taken on a `PACKED` request and the shipping
    /// location only on a `DISPATCHED` request.
    pub fn apply(&mut self, update: &PackageUpdate, now: DateTime<Utc>) {
        match update.status {
            PackageStatus::Packed => {
                if let Some(weight) = &update.weight {
                    self.weight = Some(weight.clone());
                }
                if let Some(packer_name) = &update.packer_name {
                    self.packer_name = Some(packer_name.clone());
                }
            }
            PackageStatus::Dispatched => {
                if let Some(location) = &update.shipping_location {
                    self.shipping_location = Some(location.clone());
                }
            }
            _ => {}
        }
        self.status = update.status.clone();
        self.updated_at = now;
    }

    /// Guard and merge in one step.
    pub fn transition(&mut self, update: &PackageUpdate, now: DateTime<Utc>) -> CoreResult<()> {
        check_transition(Some(&self.status), &update.status)?;
        self.apply(update, now);
        Ok(())
    }
}

/// A requested status change plus the fields that travel with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub status: PackageStatus,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub packer_name: Option<String>,
    #[serde(default)]
    pub shipping_location: Option<String>,
}

impl PackageUpdate {
    pub fn new(status: PackageStatus) -> Self {
        Self {
            status,
            weight: None,
            packer_name: None,
            shipping_location: None,
        }
    }

    pub fn packed(weight: impl Into<String>, packer_name: impl Into<String>) -> Self {
        Self {
            weight: Some(weight.into()),
            packer_name: Some(packer_name.into()),
            ..Self::new(PackageStatus::Packed)
        }
    }

    pub fn dispatched(shipping_location: impl Into<String>) -> Self {
        Self {
            shipping_location: Some(shipping_location.into()),
            ..Self::new(PackageStatus::Dispatched)
        }
    }

    /// Trim free-text fields, drop blank ones and reject a status outside
    /// the lifecycle. Unknown values are only tolerated on stored rows.
    pub fn normalized(self) -> CoreResult<Self> {
        if self.status.as_str().trim().is_empty() {
            return Err(CoreError::Validation("status must not be empty".into()));
        }
        if !self.status.is_known() {
            return Err(CoreError::Validation(format!(
                "unknown status: {} (expected PENDING, PACKED, DISPATCHED or DELIVERED)",
                self.status
            )));
        }
        Ok(Self {
            status: self.status,
            weight: non_blank(self.weight),
            packer_name: non_blank(self.packer_name),
            shipping_location: non_blank(self.shipping_location),
        })
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Code,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter and sort options for listing packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageQuery {
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default)]
    pub code_prefix: Option<String>,
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PackageQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn with_status(status: PackageStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Effective row limit, clamped to [`Self::MAX_LIMIT`].
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Filter predicate for stores that evaluate queries in process.
    pub fn matches(&self, record: &PackageRecord) -> bool {
        if let Some(status) = &self.status {
            if &record.status != status {
                return false;
            }
        }
        if let Some(prefix) = &self.code_prefix {
            if !record.code.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }

    /// Ordering for stores that sort in process.
    pub fn compare(&self, a: &PackageRecord, b: &PackageRecord) -> Ordering {
        let ordering = match self.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at).then(a.code.cmp(&b.code)),
            SortField::Code => a.code.cmp(&b.code),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Apply filter, sort and limit to an in-memory collection.
    pub fn apply<'a, I>(&self, records: I) -> Vec<PackageRecord>
    where
        I: IntoIterator<Item = &'a PackageRecord>,
    {
        let mut selected: Vec<PackageRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        selected.sort_by(|a, b| self.compare(a, b));
        selected.truncate(self.effective_limit() as usize);
        selected
    }
}

/// Package counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

impl StatusSummary {
    /// Build a summary from raw `(status, count)` rows. Every lifecycle status
    /// is present in the result, with zero when no row mentions it.
    pub fn from_counts<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (PackageStatus, u64)>,
    {
        let mut counts: BTreeMap<String, u64> = PackageStatus::LIFECYCLE
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        let mut total = 0;
        for (status, count) in rows {
            *counts.entry(status.to_string()).or_insert(0) += count;
            total += count;
        }
        Self { total, counts }
    }

    pub fn count(&self, status: &PackageStatus) -> u64 {
        self.counts.get(status.as_str()).copied().unwrap_or(0)
    }
}

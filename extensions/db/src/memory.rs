//! In-process record store.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use packtrack_core::attendance::{AttendanceQuery, AttendanceRecord};
use packtrack_core::daily_log::{DailyLog, DailyLogQuery, LogKind};
use packtrack_core::{PackageQuery, PackageRecord, PackageStatus};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Tables {
    packages: BTreeMap<String, PackageRecord>,
    attendance: BTreeMap<(String, NaiveDate), AttendanceRecord>,
    daily_logs: BTreeMap<(LogKind, NaiveDate, String), DailyLog>,
}

/// A `RecordStore` held entirely in memory.
///
/// Can be switched offline to simulate an unreachable backend.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unavailable` (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.online()
    }

    async fn insert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        self.online()?;
        let mut tables = self.tables.write();
        if tables.packages.contains_key(&record.code) {
            return Err(StoreError::Conflict(format!("package {}", record.code)));
        }
        tables.packages.insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn upsert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        self.online()?;
        self.tables
            .write()
            .packages
            .insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn get_package(&self, code: &str) -> StoreResult<Option<PackageRecord>> {
        self.online()?;
        Ok(self.tables.read().packages.get(code).cloned())
    }

    async fn save_package(&self, record: &PackageRecord) -> StoreResult<()> {
        self.online()?;
        let mut tables = self.tables.write();
        match tables.packages.get_mut(&record.code) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.code.clone())),
        }
    }

    async fn list_packages(&self, query: &PackageQuery) -> StoreResult<Vec<PackageRecord>> {
        self.online()?;
        Ok(query.apply(self.tables.read().packages.values()))
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(PackageStatus, u64)>> {
        self.online()?;
        let mut counts: HashMap<PackageStatus, u64> = HashMap::new();
        for record in self.tables.read().packages.values() {
            *counts.entry(record.status.clone()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_codes_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        self.online()?;
        let tables = self.tables.read();
        let count = tables
            .packages
            .range(prefix.to_string()..)
            .take_while(|(code, _)| code.starts_with(prefix))
            .count();
        Ok(count as u64)
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        self.online()?;
        self.tables
            .write()
            .attendance
            .insert(record.key(), record.clone());
        Ok(record.clone())
    }

    async fn list_attendance(&self, query: &AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        self.online()?;
        let mut rows: Vec<AttendanceRecord> = self
            .tables
            .read()
            .attendance
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.worker_name.cmp(&b.worker_name)));
        Ok(rows)
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        self.online()?;
        self.tables.write().daily_logs.insert(log.key(), log.clone());
        Ok(log.clone())
    }

    async fn list_daily_logs(&self, query: &DailyLogQuery) -> StoreResult<Vec<DailyLog>> {
        self.online()?;
        let mut rows: Vec<DailyLog> = self
            .tables
            .read()
            .daily_logs
            .values()
            .filter(|l| query.matches(l))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.area.cmp(&b.area))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use packtrack_core::attendance::AttendanceStatus;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_code() {
        let store = MemoryStore::new();
        let record = PackageRecord::new("20261018-0001", Utc::now());
        store.insert_package(&record).await.unwrap();
        assert!(matches!(
            store.insert_package(&record).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_save_requires_existing_row() {
        let store = MemoryStore::new();
        let record = PackageRecord::new("missing", Utc::now());
        assert_eq!(
            store.save_package(&record).await,
            Err(StoreError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_prefix_count_only_counts_matching_codes() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for code in ["20261017-0001", "20261018-0001", "20261018-0002", "20261019-0001"] {
            store.insert_package(&PackageRecord::new(code, now)).await.unwrap();
        }
        assert_eq!(store.count_codes_with_prefix("20261018-").await.unwrap(), 2);
        assert_eq!(store.count_codes_with_prefix("2027").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attendance_upsert_replaces_same_day_row() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut record = AttendanceRecord {
            worker_name: "Ravi".into(),
            date,
            status: AttendanceStatus::Absent,
            check_in: None,
            check_out: None,
            notes: None,
            updated_at: Utc::now(),
        };
        store.upsert_attendance(&record).await.unwrap();
        record.status = AttendanceStatus::Present;
        record.check_in = NaiveTime::from_hms_opt(9, 15, 0);
        store.upsert_attendance(&record).await.unwrap();

        let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store.ping().await.unwrap_err();
        assert!(err.is_availability());
        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}

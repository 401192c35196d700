//! Primary store with a local cache that takes over when the primary is down.

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;
use async_trait::async_trait;
use packtrack_core::attendance::{AttendanceQuery, AttendanceRecord};
use packtrack_core::daily_log::{DailyLog, DailyLogQuery};
use packtrack_core::{PackageQuery, PackageRecord, PackageStatus};
use std::future::Future;

/// Routes every call to `primary`, and to `cache` when the primary fails with
/// an availability error.
///
/// Writes accepted by the primary are mirrored into the cache so it can
/// answer for them later. Package rows written to the cache during an outage
/// carry a newer `updated_at` than the primary's copy; reading such a row
/// after recovery writes it back to the primary instead of overwriting it.
/// Domain errors such as `NotFound` or `Conflict` are returned as-is and
/// never trigger the fallback.
pub struct FallbackStore<P, C> {
    primary: P,
    cache: C,
}

impl<P, C> FallbackStore<P, C>
where
    P: RecordStore,
    C: RecordStore,
{
    pub fn new(primary: P, cache: C) -> Self {
        Self { primary, cache }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    async fn route<'a, T, PF, CF>(&'a self, op: &'static str, primary: PF, cache: CF) -> StoreResult<T>
    where
        PF: Future<Output = StoreResult<T>> + Send + 'a,
        CF: FnOnce(&'a C) -> std::pin::Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>,
    {
        match primary.await {
            Err(err) if err.is_availability() => {
                tracing::warn!(
                    op,
                    primary = self.primary.backend(),
                    cache = self.cache.backend(),
                    error = %err,
                    "Primary store unavailable, using cache"
                );
                cache(&self.cache).await
            }
            other => other,
        }
    }

    /// Copy `record` into the cache unless the cache holds a newer copy.
    async fn mirror(&self, record: &PackageRecord) {
        if let Ok(Some(cached)) = self.cache.get_package(&record.code).await {
            if cached.updated_at > record.updated_at {
                tracing::debug!(code = %record.code, "Cache copy is newer, not mirroring");
                return;
            }
        }
        if let Err(err) = self.cache.upsert_package(record).await {
            tracing::warn!(code = %record.code, error = %err, "Failed to mirror package into cache");
        }
    }

    /// Push a row the primary missed back to it. The cache copy is still
    /// served if the primary refuses.
    async fn restore(&self, record: &PackageRecord) {
        tracing::warn!(code = %record.code, "Restoring package written to cache during an outage");
        if let Err(err) = self.primary.upsert_package(record).await {
            tracing::warn!(code = %record.code, error = %err, "Failed to restore package to primary");
        }
    }

    /// Pick the newer of the primary row and the cached row for `code`.
    async fn reconcile(&self, code: &str, primary: Option<PackageRecord>) -> Option<PackageRecord> {
        let cached = match self.cache.get_package(code).await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(code, error = %err, "Cache lookup failed");
                None
            }
        };
        match (primary, cached) {
            (Some(primary), Some(cached)) if cached.updated_at > primary.updated_at => {
                self.restore(&cached).await;
                Some(cached)
            }
            (None, Some(cached)) => {
                self.restore(&cached).await;
                Some(cached)
            }
            (Some(primary), cached) => {
                if cached.as_ref() != Some(&primary) {
                    if let Err(err) = self.cache.upsert_package(&primary).await {
                        tracing::warn!(code, error = %err, "Failed to mirror package into cache");
                    }
                }
                Some(primary)
            }
            (None, None) => None,
        }
    }
}

#[async_trait]
impl<P, C> RecordStore for FallbackStore<P, C>
where
    P: RecordStore,
    C: RecordStore,
{
    fn backend(&self) -> &'static str {
        "fallback"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.route("ping", self.primary.ping(), |c| c.ping()).await
    }

    async fn insert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        match self.primary.insert_package(record).await {
            Ok(()) => {
                self.mirror(record).await;
                Ok(())
            }
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "insert_package", error = %err, "Primary store unavailable, using cache");
                self.cache.insert_package(record).await
            }
            Err(err) => Err(err),
        }
    }

    async fn upsert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        match self.primary.upsert_package(record).await {
            Ok(()) => {
                self.mirror(record).await;
                Ok(())
            }
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "upsert_package", error = %err, "Primary store unavailable, using cache");
                self.cache.upsert_package(record).await
            }
            Err(err) => Err(err),
        }
    }

    async fn get_package(&self, code: &str) -> StoreResult<Option<PackageRecord>> {
        match self.primary.get_package(code).await {
            Ok(record) => Ok(self.reconcile(code, record).await),
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "get_package", error = %err, "Primary store unavailable, using cache");
                self.cache.get_package(code).await
            }
            Err(err) => Err(err),
        }
    }

    async fn save_package(&self, record: &PackageRecord) -> StoreResult<()> {
        match self.primary.save_package(record).await {
            Ok(()) => {
                self.mirror(record).await;
                Ok(())
            }
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "save_package", error = %err, "Primary store unavailable, using cache");
                match self.cache.save_package(record).await {
                    // The cache may never have seen this row.
                    Err(StoreError::NotFound(_)) => self.cache.upsert_package(record).await,
                    other => other,
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn list_packages(&self, query: &PackageQuery) -> StoreResult<Vec<PackageRecord>> {
        self.route("list_packages", self.primary.list_packages(query), |c| {
            c.list_packages(query)
        })
        .await
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(PackageStatus, u64)>> {
        self.route("count_by_status", self.primary.count_by_status(), |c| {
            c.count_by_status()
        })
        .await
    }

    /// The larger of both counts, so codes issued to the cache during an
    /// outage are not handed out again.
    async fn count_codes_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let cached = self.cache.count_codes_with_prefix(prefix).await;
        match self.primary.count_codes_with_prefix(prefix).await {
            Ok(count) => Ok(count.max(cached.unwrap_or(0))),
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "count_codes_with_prefix", error = %err, "Primary store unavailable, using cache");
                cached
            }
            Err(err) => Err(err),
        }
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        match self.primary.upsert_attendance(record).await {
            Ok(stored) => {
                if let Err(err) = self.cache.upsert_attendance(&stored).await {
                    tracing::warn!(worker = %stored.worker_name, error = %err, "Failed to mirror attendance into cache");
                }
                Ok(stored)
            }
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "upsert_attendance", error = %err, "Primary store unavailable, using cache");
                self.cache.upsert_attendance(record).await
            }
            Err(err) => Err(err),
        }
    }

    async fn list_attendance(&self, query: &AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        self.route("list_attendance", self.primary.list_attendance(query), |c| {
            c.list_attendance(query)
        })
        .await
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        match self.primary.upsert_daily_log(log).await {
            Ok(stored) => {
                if let Err(err) = self.cache.upsert_daily_log(&stored).await {
                    tracing::warn!(area = %stored.area, error = %err, "Failed to mirror daily log into cache");
                }
                Ok(stored)
            }
            Err(err) if err.is_availability() => {
                tracing::warn!(op = "upsert_daily_log", error = %err, "Primary store unavailable, using cache");
                self.cache.upsert_daily_log(log).await
            }
            Err(err) => Err(err),
        }
    }

    async fn list_daily_logs(&self, query: &DailyLogQuery) -> StoreResult<Vec<DailyLog>> {
        self.route("list_daily_logs", self.primary.list_daily_logs(query), |c| {
            c.list_daily_logs(query)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{Duration, NaiveDate, Utc};
    use packtrack_core::attendance::AttendanceStatus;
    use std::sync::Arc;

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>, FallbackStore<Arc<MemoryStore>, Arc<MemoryStore>>) {
        let primary = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryStore::new());
        let store = FallbackStore::new(primary.clone(), cache.clone());
        (primary, cache, store)
    }

    #[tokio::test]
    async fn test_primary_writes_are_mirrored() {
        let (primary, cache, store) = stores();
        let record = PackageRecord::new("20261018-0001", Utc::now());
        store.insert_package(&record).await.unwrap();

        assert!(primary.get_package(&record.code).await.unwrap().is_some());
        assert!(cache.get_package(&record.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reads_fall_back_when_primary_is_down() {
        let (primary, _cache, store) = stores();
        let record = PackageRecord::new("20261018-0001", Utc::now());
        store.insert_package(&record).await.unwrap();

        primary.set_offline(true);
        assert_eq!(store.get_package(&record.code).await.unwrap(), Some(record));
        assert_eq!(store.count_codes_with_prefix("20261018-").await.unwrap(), 1);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_writes_go_to_cache_when_primary_is_down() {
        let (primary, cache, store) = stores();
        primary.set_offline(true);

        let mut record = PackageRecord::new("20261018-0002", Utc::now());
        store.insert_package(&record).await.unwrap();
        record.status = PackageStatus::Packed;
        store.save_package(&record).await.unwrap();

        primary.set_offline(false);
        assert_eq!(primary.get_package(&record.code).await.unwrap(), None);
        assert_eq!(
            cache.get_package(&record.code).await.unwrap().unwrap().status,
            PackageStatus::Packed
        );
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_masked() {
        let (_primary, cache, store) = stores();
        let record = PackageRecord::new("20261018-0003", Utc::now());
        cache.insert_package(&record).await.unwrap();

        // Known only to the cache, but the primary answered.
        assert_eq!(
            store.save_package(&record).await,
            Err(StoreError::NotFound("20261018-0003".to_string()))
        );

        store.insert_package(&PackageRecord::new("20261018-0004", Utc::now())).await.unwrap();
        assert!(matches!(
            store
                .insert_package(&PackageRecord::new("20261018-0004", Utc::now()))
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_both_down_reports_cache_error() {
        let (primary, cache, store) = stores();
        primary.set_offline(true);
        cache.set_offline(true);
        let err = store.list_packages(&PackageQuery::default()).await.unwrap_err();
        assert!(err.is_availability());
    }

    #[tokio::test]
    async fn test_outage_update_survives_recovery() {
        let (primary, cache, store) = stores();
        let mut record = PackageRecord::new("20261018-0005", Utc::now() - Duration::minutes(10));
        store.insert_package(&record).await.unwrap();

        primary.set_offline(true);
        record.status = PackageStatus::Packed;
        record.updated_at = Utc::now();
        store.save_package(&record).await.unwrap();
        primary.set_offline(false);

        let read = store.get_package(&record.code).await.unwrap().unwrap();
        assert_eq!(read.status, PackageStatus::Packed);
        assert_eq!(
            primary.get_package(&record.code).await.unwrap().unwrap().status,
            PackageStatus::Packed
        );
        assert_eq!(
            cache.get_package(&record.code).await.unwrap().unwrap().status,
            PackageStatus::Packed
        );
    }

    #[tokio::test]
    async fn test_outage_insert_is_restored_and_not_reissued() {
        let (primary, _cache, store) = stores();
        store
            .insert_package(&PackageRecord::new("20261018-0001", Utc::now()))
            .await
            .unwrap();

        primary.set_offline(true);
        let issued = PackageRecord::new("20261018-0002", Utc::now());
        store.insert_package(&issued).await.unwrap();
        primary.set_offline(false);

        assert_eq!(store.count_codes_with_prefix("20261018-").await.unwrap(), 2);
        assert_eq!(store.get_package(&issued.code).await.unwrap(), Some(issued.clone()));
        assert_eq!(primary.get_package(&issued.code).await.unwrap(), Some(issued));
    }

    #[tokio::test]
    async fn test_newer_primary_row_replaces_cache() {
        let (primary, cache, store) = stores();
        let mut record = PackageRecord::new("20261018-0006", Utc::now() - Duration::minutes(10));
        cache.insert_package(&record).await.unwrap();
        record.status = PackageStatus::Dispatched;
        record.updated_at = Utc::now();
        primary.insert_package(&record).await.unwrap();

        assert_eq!(store.get_package(&record.code).await.unwrap(), Some(record.clone()));
        assert_eq!(cache.get_package(&record.code).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_attendance_is_mirrored_for_outages() {
        let (primary, cache, store) = stores();
        let record = AttendanceRecord {
            worker_name: "Ravi".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            status: AttendanceStatus::Present,
            check_in: None,
            check_out: None,
            notes: None,
            updated_at: Utc::now(),
        };
        store.upsert_attendance(&record).await.unwrap();
        assert_eq!(cache.list_attendance(&AttendanceQuery::default()).await.unwrap().len(), 1);

        primary.set_offline(true);
        let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
        assert_eq!(rows, vec![record]);
    }
}

//! The record store contract.

use crate::error::StoreResult;
use async_trait::async_trait;
use packtrack_core::attendance::{AttendanceQuery, AttendanceRecord};
use packtrack_core::daily_log::{DailyLog, DailyLogQuery};
use packtrack_core::{PackageQuery, PackageRecord, PackageStatus};
use std::sync::Arc;

/// Row store behind every packtrack service.
///
/// Implementations must make `upsert_*` a single atomic write keyed on the
/// record's conflict key; callers never check for existence first.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check that the store answers.
    async fn ping(&self) -> StoreResult<()>;

    /// Insert a new package; `Conflict` if the code is taken.
    async fn insert_package(&self, record: &PackageRecord) -> StoreResult<()>;

    /// Insert or replace a package by code.
    async fn upsert_package(&self, record: &PackageRecord) -> StoreResult<()>;

    async fn get_package(&self, code: &str) -> StoreResult<Option<PackageRecord>>;

    /// Overwrite an existing package; `NotFound` if the code is unknown.
    async fn save_package(&self, record: &PackageRecord) -> StoreResult<()>;

    async fn list_packages(&self, query: &PackageQuery) -> StoreResult<Vec<PackageRecord>>;

    /// Raw `(status, count)` rows.
    async fn count_by_status(&self) -> StoreResult<Vec<(PackageStatus, u64)>>;

    async fn count_codes_with_prefix(&self, prefix: &str) -> StoreResult<u64>;

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord>;

    /// Newest date first, then by worker name.
    async fn list_attendance(&self, query: &AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>>;

    async fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog>;

    /// Newest date first, then by kind and area.
    async fn list_daily_logs(&self, query: &DailyLogQuery) -> StoreResult<Vec<DailyLog>>;
}

pub type SharedStore = Arc<dyn RecordStore>;

/// Lets a shared handle stand in for the store itself.
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn ping(&self) -> StoreResult<()> {
        (**self).ping().await
    }

    async fn insert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        (**self).insert_package(record).await
    }

    async fn upsert_package(&self, record: &PackageRecord) -> StoreResult<()> {
        (**self).upsert_package(record).await
    }

    async fn get_package(&self, code: &str) -> StoreResult<Option<PackageRecord>> {
        (**self).get_package(code).await
    }

    async fn save_package(&self, record: &PackageRecord) -> StoreResult<()> {
        (**self).save_package(record).await
    }

    async fn list_packages(&self, query: &PackageQuery) -> StoreResult<Vec<PackageRecord>> {
        (**self).list_packages(query).await
    }

    async fn count_by_status(&self) -> StoreResult<Vec<(PackageStatus, u64)>> {
        (**self).count_by_status().await
    }

    async fn count_codes_with_prefix(&self, prefix: &str) -> StoreResult<u64> {
        (**self).count_codes_with_prefix(prefix).await
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> StoreResult<AttendanceRecord> {
        (**self).upsert_attendance(record).await
    }

    async fn list_attendance(&self, query: &AttendanceQuery) -> StoreResult<Vec<AttendanceRecord>> {
        (**self).list_attendance(query).await
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> StoreResult<DailyLog> {
        (**self).upsert_daily_log(log).await
    }

    async fn list_daily_logs(&self, query: &DailyLogQuery) -> StoreResult<Vec<DailyLog>> {
        (**self).list_daily_logs(query).await
    }
}

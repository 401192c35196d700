//! Package and record-keeping services over a [`SharedStore`].

use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::node::{
    CheckTransition, LookupPackage, MergeUpdate, PersistPackage, StatusRequest, StoreResources,
};
use crate::store::SharedStore;
use chrono::{DateTime, Utc};
use packtrack_core::attendance::{AttendanceEntry, AttendanceQuery, AttendanceRecord};
use packtrack_core::axon::{Axon, Schematic};
use packtrack_core::bus::Bus;
use packtrack_core::code::{day_prefix, format_code, validate_code};
use packtrack_core::daily_log::{DailyLog, DailyLogEntry, DailyLogQuery};
use packtrack_core::{
    CoreError, PackageQuery, PackageRecord, PackageUpdate, SessionContext, StatusSummary,
};
use std::sync::Arc;

/// Most codes one `generate` call may issue.
pub const MAX_BATCH: u32 = 500;

/// Insert attempts per code before giving up on serial collisions.
const MAX_CODE_ATTEMPTS: u32 = 5;

type UpdatePipeline = Axon<StatusRequest, PackageRecord, ServiceError, StoreResources>;

/// Package lifecycle operations.
#[derive(Clone)]
pub struct PackageService {
    resources: Arc<StoreResources>,
    pipeline: UpdatePipeline,
}

impl PackageService {
    pub fn new(store: SharedStore) -> Self {
        let pipeline: UpdatePipeline = Axon::new("UpdatePackageStatus")
            .then(LookupPackage)
            .then(CheckTransition)
            .then(MergeUpdate)
            .then(PersistPackage);
        Self {
            resources: Arc::new(StoreResources::new(store)),
            pipeline,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.resources.store
    }

    /// Structure of the status update pipeline.
    pub fn schematic(&self) -> &Schematic {
        self.pipeline.schematic()
    }

    /// Issue `count` new `PENDING` packages dated today (UTC).
    pub async fn generate(&self, count: u32) -> ServiceResult<Vec<PackageRecord>> {
        self.generate_at(count, Utc::now()).await
    }

    /// Issue `count` new packages as of `now`.
    ///
    /// Serials continue after the codes already issued for the day. A serial
    /// taken by a concurrent writer is skipped, up to a few times per code.
    pub async fn generate_at(
        &self,
        count: u32,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<PackageRecord>> {
        if !(1..=MAX_BATCH).contains(&count) {
            return Err(CoreError::Validation(format!(
                "count must be between 1 and {MAX_BATCH}, got {count}"
            ))
            .into());
        }

        let date = now.date_naive();
        let store = &self.resources.store;
        let issued = store.count_codes_with_prefix(&day_prefix(date)).await?;
        let mut next = u32::try_from(issued)
            .map_err(|_| CoreError::Validation(format!("too many codes issued on {date}")))?;

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut attempts = 0;
            let record = loop {
                next += 1;
                attempts += 1;
                let record = PackageRecord::new(format_code(date, next), now);
                match store.insert_package(&record).await {
                    Ok(()) => break record,
                    Err(StoreError::Conflict(_)) if attempts < MAX_CODE_ATTEMPTS => {
                        tracing::debug!(code = %record.code, attempts, "Code already taken, trying next serial");
                    }
                    Err(e) => return Err(e.into()),
                }
            };
            records.push(record);
        }

        tracing::info!(
            count,
            first = records.first().map(|r| r.code.as_str()).unwrap_or_default(),
            "Generated package codes"
        );
        Ok(records)
    }

    pub async fn get(&self, code: &str) -> ServiceResult<PackageRecord> {
        let code = validate_code(code)?;
        self.resources
            .store
            .get_package(code)
            .await?
            .ok_or_else(|| StoreError::NotFound(code.to_string()).into())
    }

    /// Guarded status update. Reads the acting [`SessionContext`] from `bus`
    /// if the caller put one there.
    pub async fn update_status(
        &self,
        code: &str,
        update: PackageUpdate,
        bus: &mut Bus,
    ) -> ServiceResult<PackageRecord> {
        let request = StatusRequest {
            code: code.to_string(),
            update,
        };
        self.pipeline
            .execute(request, &self.resources, bus)
            .await
            .into_result()
    }

    pub async fn list(&self, query: &PackageQuery) -> ServiceResult<Vec<PackageRecord>> {
        Ok(self.resources.store.list_packages(query).await?)
    }

    /// Package counts per status, with every lifecycle status present.
    pub async fn summary(&self) -> ServiceResult<StatusSummary> {
        let rows = self.resources.store.count_by_status().await?;
        Ok(StatusSummary::from_counts(rows))
    }
}

/// Attendance and daily photo logs.
#[derive(Clone)]
pub struct RecordBook {
    store: SharedStore,
}

impl RecordBook {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn record_attendance(&self, entry: AttendanceEntry) -> ServiceResult<AttendanceRecord> {
        let record = entry.into_record(Utc::now())?;
        let saved = self.store.upsert_attendance(&record).await?;
        tracing::info!(worker = %saved.worker_name, date = %saved.date, status = %saved.status, "Attendance recorded");
        Ok(saved)
    }

    pub async fn attendance(&self, query: &AttendanceQuery) -> ServiceResult<Vec<AttendanceRecord>> {
        Ok(self.store.list_attendance(query).await?)
    }

    /// Upsert a log entry, stamping it with the session's operator.
    pub async fn record_log(
        &self,
        entry: DailyLogEntry,
        session: &SessionContext,
    ) -> ServiceResult<DailyLog> {
        let log = entry.into_log(Some(session.actor().to_string()), Utc::now())?;
        let saved = self.store.upsert_daily_log(&log).await?;
        tracing::info!(kind = %saved.kind, date = %saved.date, area = %saved.area, "Daily log recorded");
        Ok(saved)
    }

    pub async fn logs(&self, query: &DailyLogQuery) -> ServiceResult<Vec<DailyLog>> {
        Ok(self.store.list_daily_logs(query).await?)
    }
}

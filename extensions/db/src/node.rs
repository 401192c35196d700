//! Store-backed transitions making up the package status update pipeline.
//!
//! `LookupPackage -> CheckTransition -> MergeUpdate -> PersistPackage`, each a
//! [`Transition`] over [`StoreResources`]. A fault at any step skips the rest,
//! so a rejected transition never reaches the store.

use crate::error::{ServiceError, StoreError};
use crate::store::SharedStore;
use async_trait::async_trait;
use chrono::Utc;
use packtrack_core::bus::Bus;
use packtrack_core::code::validate_code;
use packtrack_core::guard::check_transition;
use packtrack_core::outcome::Outcome;
use packtrack_core::transition::Transition;
use packtrack_core::{PackageRecord, PackageStatus, PackageUpdate, SessionContext};

/// Shared resources for store-backed transitions.
#[derive(Clone)]
pub struct StoreResources {
    pub store: SharedStore,
}

impl StoreResources {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

/// Pipeline input: which package, and what to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub code: String,
    pub update: PackageUpdate,
}

/// A loaded record together with the update requested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub record: PackageRecord,
    pub update: PackageUpdate,
}

/// Status the record had before the pipeline touched it. Left on the bus by
/// [`CheckTransition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousStatus(pub PackageStatus);

// ============== LookupPackage ==============

/// Validates the request and loads the record; `NotFound` if the code is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupPackage;

#[async_trait]
impl Transition<StatusRequest, PendingChange> for LookupPackage {
    type Error = ServiceError;
    type Resources = StoreResources;

    fn description(&self) -> Option<String> {
        Some("Load the package by code".into())
    }

    async fn run(
        &self,
        request: StatusRequest,
        resources: &StoreResources,
        _bus: &mut Bus,
    ) -> Outcome<PendingChange, ServiceError> {
        let code = match validate_code(&request.code) {
            Ok(code) => code.to_string(),
            Err(e) => return Outcome::Fault(e.into()),
        };
        let update = match request.update.normalized() {
            Ok(update) => update,
            Err(e) => return Outcome::Fault(e.into()),
        };

        match resources.store.get_package(&code).await {
            Ok(Some(record)) => Outcome::Next(PendingChange { record, update }),
            Ok(None) => Outcome::Fault(StoreError::NotFound(code).into()),
            Err(e) => Outcome::Fault(e.into()),
        }
    }
}

// ============== CheckTransition ==============

/// Runs the status guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckTransition;

#[async_trait]
impl Transition<PendingChange, PendingChange> for CheckTransition {
    type Error = ServiceError;
    type Resources = StoreResources;

    fn description(&self) -> Option<String> {
        Some("Reject illegal status transitions".into())
    }

    async fn run(
        &self,
        change: PendingChange,
        _resources: &StoreResources,
        bus: &mut Bus,
    ) -> Outcome<PendingChange, ServiceError> {
        if let Err(e) = check_transition(Some(&change.record.status), &change.update.status) {
            tracing::info!(
                code = %change.record.code,
                current = %change.record.status,
                requested = %change.update.status,
                "Status transition rejected"
            );
            return Outcome::Fault(e.into());
        }
        bus.insert(PreviousStatus(change.record.status.clone()));
        Outcome::Next(change)
    }
}

// ============== MergeUpdate ==============

/// Applies the accepted update and refreshes `updated_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeUpdate;

#[async_trait]
impl Transition<PendingChange, PackageRecord> for MergeUpdate {
    type Error = ServiceError;
    type Resources = StoreResources;

    async fn run(
        &self,
        change: PendingChange,
        _resources: &StoreResources,
        _bus: &mut Bus,
    ) -> Outcome<PackageRecord, ServiceError> {
        let PendingChange { mut record, update } = change;
        record.apply(&update, Utc::now());
        Outcome::Next(record)
    }
}

// ============== PersistPackage ==============

/// Writes the merged record back.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistPackage;

#[async_trait]
impl Transition<PackageRecord, PackageRecord> for PersistPackage {
    type Error = ServiceError;
    type Resources = StoreResources;

    fn description(&self) -> Option<String> {
        Some("Save the updated package".into())
    }

    async fn run(
        &self,
        record: PackageRecord,
        resources: &StoreResources,
        bus: &mut Bus,
    ) -> Outcome<PackageRecord, ServiceError> {
        if let Err(e) = resources.store.save_package(&record).await {
            return Outcome::Fault(e.into());
        }

        let actor = bus
            .get::<SessionContext>()
            .map(|s| s.actor().to_string())
            .unwrap_or_else(|| "system".to_string());
        let from = bus
            .get::<PreviousStatus>()
            .map(|p| p.0.to_string())
            .unwrap_or_default();
        tracing::info!(
            code = %record.code,
            from = %from,
            to = %record.status,
            actor = %actor,
            "Package status updated"
        );
        Outcome::Next(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::RecordStore;
    use packtrack_core::CoreError;
    use std::sync::Arc;

    async fn resources_with(record: PackageRecord) -> (Arc<MemoryStore>, StoreResources) {
        let store = Arc::new(MemoryStore::new());
        store.insert_package(&record).await.unwrap();
        let resources = StoreResources::new(store.clone());
        (store, resources)
    }

    #[tokio::test]
    async fn test_lookup_reports_unknown_code() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let resources = StoreResources::new(store);
        let request = StatusRequest {
            code: "20261018-0404".into(),
            update: PackageUpdate::new(PackageStatus::Packed),
        };
        let outcome = LookupPackage
            .run(request, &resources, &mut Bus::new())
            .await;
        assert_eq!(
            outcome,
            Outcome::Fault(ServiceError::Store(StoreError::NotFound("20261018-0404".into())))
        );
    }

    #[tokio::test]
    async fn test_lookup_rejects_malformed_code() {
        let (_store, resources) = resources_with(PackageRecord::new("20261018-0001", Utc::now())).await;
        let request = StatusRequest {
            code: "../etc".into(),
            update: PackageUpdate::new(PackageStatus::Packed),
        };
        let outcome = LookupPackage.run(request, &resources, &mut Bus::new()).await;
        assert!(matches!(
            outcome,
            Outcome::Fault(ServiceError::Core(CoreError::InvalidCode(_)))
        ));
    }

    #[tokio::test]
    async fn test_check_records_previous_status_on_bus() {
        let record = PackageRecord::new("20261018-0001", Utc::now());
        let (_store, resources) = resources_with(record.clone()).await;
        let mut bus = Bus::new();
        let change = PendingChange {
            record,
            update: PackageUpdate::new(PackageStatus::Packed),
        };

        assert!(matches!(
            CheckTransition.run(change, &resources, &mut bus).await,
            Outcome::Next(_)
        ));
        assert_eq!(
            bus.get::<PreviousStatus>(),
            Some(&PreviousStatus(PackageStatus::Pending))
        );
    }

    #[tokio::test]
    async fn test_persist_writes_record() {
        let mut record = PackageRecord::new("20261018-0001", Utc::now());
        let (store, resources) = resources_with(record.clone()).await;
        record.status = PackageStatus::Packed;

        let outcome = PersistPackage
            .run(record.clone(), &resources, &mut Bus::new())
            .await;
        assert_eq!(outcome, Outcome::Next(record.clone()));
        assert_eq!(store.get_package(&record.code).await.unwrap(), Some(record));
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, Local, NaiveDate};
use serde_json::Value;

use crate::workflows::post_sales::domain::{
    CommissionRecord, ContractDetail, ContractId, ContractKey, ContractStatusRecord,
    ContractType, ObjectionRecord, OverdueEntry,
};
use crate::workflows::post_sales::store::{ContractStore, StatusQuery, StoreError};
use crate::workflows::post_sales::{
    post_sales_router, InMemoryAuditLog, InMemoryContractStore, PostSalesService, RuleCatalog,
    SupplierPolicy, TransitionRunner,
};

pub(super) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn electric(id: &str) -> ContractKey {
    ContractKey::new(id, ContractType::Electric)
}

pub(super) fn gas(id: &str) -> ContractKey {
    ContractKey::new(id, ContractType::Gas)
}

pub(super) fn status_record(key: ContractKey, status: &str) -> ContractStatusRecord {
    ContractStatusRecord {
        key,
        status: status.to_string(),
        last_modified: Local::now() - Duration::days(7),
        creation_date: Some(Local::now() - Duration::days(400)),
    }
}

pub(super) fn commission(
    key: &ContractKey,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> CommissionRecord {
    CommissionRecord {
        contract_id: key.contract_id.clone(),
        contract_type: Some(key.contract_type),
        start_date: start_date.map(str::to_string),
        contract_end_date: end_date.map(str::to_string),
        contract_end_date_cot: None,
    }
}

pub(super) fn detail(
    key: &ContractKey,
    initial_start_date: Option<&str>,
    supplier_id: Option<i64>,
) -> ContractDetail {
    ContractDetail {
        key: key.clone(),
        initial_start_date: initial_start_date.map(str::to_string),
        business_name: Some("Harbour Street Dental".to_string()),
        meter_identifier: Some("1012345678901".to_string()),
        supplier_id,
    }
}

pub(super) fn objection(key: &ContractKey, date: Option<&str>, count: u32) -> ObjectionRecord {
    ObjectionRecord {
        key: key.clone(),
        objection_date: date.map(str::to_string),
        objection_count: count,
        query_type: Some("Objection".to_string()),
    }
}

pub(super) fn build_runner<S: ContractStore>(
    store: Arc<S>,
) -> (TransitionRunner<S, InMemoryAuditLog>, Arc<InMemoryAuditLog>) {
    let audit = Arc::new(InMemoryAuditLog::default());
    let runner = TransitionRunner::new(
        store,
        audit.clone(),
        Arc::new(SupplierPolicy::standard()),
    );
    (runner, audit)
}

pub(super) fn build_service<S: ContractStore>(
    store: Arc<S>,
) -> (PostSalesService<S, InMemoryAuditLog>, Arc<InMemoryAuditLog>) {
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = PostSalesService::new(
        store,
        audit.clone(),
        Arc::new(SupplierPolicy::standard()),
        RuleCatalog::default(),
    );
    (service, audit)
}

pub(super) fn router_with_store<S: ContractStore>(store: Arc<S>) -> axum::Router {
    let (service, _) = build_service(store);
    post_sales_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails as if the database were offline.
pub(super) struct UnavailableStore;

#[async_trait]
impl ContractStore for UnavailableStore {
    async fn fetch_by_status(
        &self,
        _query: &StatusQuery,
    ) -> Result<Vec<ContractStatusRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn fetch_commission(
        &self,
        _key: &ContractKey,
    ) -> Result<Option<CommissionRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn fetch_contract_detail(
        &self,
        _key: &ContractKey,
    ) -> Result<Option<ContractDetail>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn fetch_objection(
        &self,
        _contract_id: &ContractId,
        _contract_type: Option<ContractType>,
    ) -> Result<Option<ObjectionRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn batch_update_statuses(
        &self,
        _keys: &[ContractKey],
        _expected_status: &str,
        _new_status: &str,
        _modified_at: DateTime<Local>,
    ) -> Result<Vec<ContractKey>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn insert_overdue_if_absent(
        &self,
        _entries: &[OverdueEntry],
    ) -> Result<Vec<ContractKey>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Reads from an in-memory store but rejects every write.
pub(super) struct ReadOnlyStore(pub(super) InMemoryContractStore);

#[async_trait]
impl ContractStore for ReadOnlyStore {
    async fn fetch_by_status(
        &self,
        query: &StatusQuery,
    ) -> Result<Vec<ContractStatusRecord>, StoreError> {
        self.0.fetch_by_status(query).await
    }

    async fn fetch_commission(
        &self,
        key: &ContractKey,
    ) -> Result<Option<CommissionRecord>, StoreError> {
        self.0.fetch_commission(key).await
    }

    async fn fetch_contract_detail(
        &self,
        key: &ContractKey,
    ) -> Result<Option<ContractDetail>, StoreError> {
        self.0.fetch_contract_detail(key).await
    }

    async fn fetch_objection(
        &self,
        contract_id: &ContractId,
        contract_type: Option<ContractType>,
    ) -> Result<Option<ObjectionRecord>, StoreError> {
        self.0.fetch_objection(contract_id, contract_type).await
    }

    async fn batch_update_statuses(
        &self,
        _keys: &[ContractKey],
        _expected_status: &str,
        _new_status: &str,
        _modified_at: DateTime<Local>,
    ) -> Result<Vec<ContractKey>, StoreError> {
        Err(StoreError::Write("read only replica".to_string()))
    }

    async fn insert_overdue_if_absent(
        &self,
        _entries: &[OverdueEntry],
    ) -> Result<Vec<ContractKey>, StoreError> {
        Err(StoreError::Write("read only replica".to_string()))
    }
}

/// Moves `contested` to another status just before the batch write lands, the way a
/// concurrent rule run would.
pub(super) struct RacingStore {
    pub(super) inner: InMemoryContractStore,
    pub(super) contested: ContractKey,
    pub(super) concurrent_status: &'static str,
}

#[async_trait]
impl ContractStore for RacingStore {
    async fn fetch_by_status(
        &self,
        query: &StatusQuery,
    ) -> Result<Vec<ContractStatusRecord>, StoreError> {
        self.inner.fetch_by_status(query).await
    }

    async fn fetch_commission(
        &self,
        key: &ContractKey,
    ) -> Result<Option<CommissionRecord>, StoreError> {
        self.inner.fetch_commission(key).await
    }

    async fn fetch_contract_detail(
        &self,
        key: &ContractKey,
    ) -> Result<Option<ContractDetail>, StoreError> {
        self.inner.fetch_contract_detail(key).await
    }

    async fn fetch_objection(
        &self,
        contract_id: &ContractId,
        contract_type: Option<ContractType>,
    ) -> Result<Option<ObjectionRecord>, StoreError> {
        self.inner.fetch_objection(contract_id, contract_type).await
    }

    async fn batch_update_statuses(
        &self,
        keys: &[ContractKey],
        expected_status: &str,
        new_status: &str,
        modified_at: DateTime<Local>,
    ) -> Result<Vec<ContractKey>, StoreError> {
        if let Some(mut record) = self.inner.status_record(&self.contested).await {
            record.status = self.concurrent_status.to_string();
            self.inner.put_status(record).await;
        }
        self.inner
            .batch_update_statuses(keys, expected_status, new_status, modified_at)
            .await
    }

    async fn insert_overdue_if_absent(
        &self,
        entries: &[OverdueEntry],
    ) -> Result<Vec<ContractKey>, StoreError> {
        self.inner.insert_overdue_if_absent(entries).await
    }
}

mod memory;

pub use memory::InMemoryContractStore;

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::domain::{
    CommissionRecord, ContractDetail, ContractId, ContractKey, ContractStatusRecord,
    ContractType, ObjectionRecord, OverdueEntry,
};

/// Filter for candidate fetches. Date bounds apply to `last_modified` and are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    pub status: String,
    pub contract_types: Option<Vec<ContractType>>,
    pub modified_from: Option<DateTime<Local>>,
    pub modified_to: Option<DateTime<Local>>,
}

impl StatusQuery {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            contract_types: None,
            modified_from: None,
            modified_to: None,
        }
    }

    pub fn matches(&self, record: &ContractStatusRecord) -> bool {
        if record.status != self.status {
            return false;
        }
        if let Some(types) = &self.contract_types {
            if !types.is_empty() && !types.contains(&record.key.contract_type) {
                return false;
            }
        }
        if let Some(from) = self.modified_from {
            if record.last_modified < from {
                return false;
            }
        }
        if let Some(to) = self.modified_to {
            if record.last_modified > to {
                return false;
            }
        }
        true
    }
}

/// Transactional contract data store consumed by the transition runner.
///
/// Lookups return `Ok(None)` for missing rows; only I/O failures are errors.
/// Batch writes are atomic: either every affected row persists or an error is returned.
#[async_trait]
pub trait ContractStore: Send + Sync + 'static {
    async fn fetch_by_status(
        &self,
        query: &StatusQuery,
    ) -> Result<Vec<ContractStatusRecord>, StoreError>;

    /// Commission row for a contract, preferring one tagged with the same type.
    async fn fetch_commission(
        &self,
        key: &ContractKey,
    ) -> Result<Option<CommissionRecord>, StoreError>;

    /// Electric or gas detail row, depending on `key.contract_type`.
    async fn fetch_contract_detail(
        &self,
        key: &ContractKey,
    ) -> Result<Option<ContractDetail>, StoreError>;

    async fn fetch_objection(
        &self,
        contract_id: &ContractId,
        contract_type: Option<ContractType>,
    ) -> Result<Option<ObjectionRecord>, StoreError>;

    /// Moves every listed row still in `expected_status` to `new_status`, stamping
    /// `modified_at`. Returns the keys of the rows actually written.
    async fn batch_update_statuses(
        &self,
        keys: &[ContractKey],
        expected_status: &str,
        new_status: &str,
        modified_at: DateTime<Local>,
    ) -> Result<Vec<ContractKey>, StoreError>;

    /// Inserts ledger rows whose key is not present yet. Returns the keys inserted.
    async fn insert_overdue_if_absent(
        &self,
        entries: &[OverdueEntry],
    ) -> Result<Vec<ContractKey>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store write rejected: {0}")]
    Write(String),
}

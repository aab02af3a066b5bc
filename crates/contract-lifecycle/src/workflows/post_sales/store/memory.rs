use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use super::{ContractStore, StatusQuery, StoreError};
use crate::workflows::post_sales::domain::{
    CommissionRecord, ContractDetail, ContractId, ContractKey, ContractStatusRecord,
    ContractType, ObjectionRecord, OverdueEntry,
};
use crate::workflows::post_sales::import::SeedData;

#[derive(Debug, Default)]
struct Tables {
    statuses: BTreeMap<ContractKey, ContractStatusRecord>,
    commissions: Vec<CommissionRecord>,
    electric: HashMap<ContractId, ContractDetail>,
    gas: HashMap<ContractId, ContractDetail>,
    objections: Vec<ObjectionRecord>,
    overdue: BTreeMap<ContractKey, OverdueEntry>,
}

/// Process-local store. Every write happens under one lock, so a batch is
/// all-or-nothing and concurrent runs see row-level last-write-wins.
#[derive(Debug, Default, Clone)]
pub struct InMemoryContractStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryContractStore {
    pub fn from_seed(seed: SeedData) -> Self {
        let mut tables = Tables::default();
        for record in seed.statuses {
            tables.statuses.insert(record.key.clone(), record);
        }
        tables.commissions = seed.commissions;
        for detail in seed.details {
            let table = match detail.key.contract_type {
                ContractType::Electric => &mut tables.electric,
                ContractType::Gas => &mut tables.gas,
            };
            table.insert(detail.key.contract_id.clone(), detail);
        }
        tables.objections = seed.objections;
        for entry in seed.overdue {
            tables.overdue.entry(entry.key.clone()).or_insert(entry);
        }

        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub async fn put_status(&self, record: ContractStatusRecord) {
        let mut tables = self.tables.write().await;
        tables.statuses.insert(record.key.clone(), record);
    }

    pub async fn put_commission(&self, record: CommissionRecord) {
        let mut tables = self.tables.write().await;
        tables.commissions.push(record);
    }

    pub async fn put_detail(&self, detail: ContractDetail) {
        let mut tables = self.tables.write().await;
        let table = match detail.key.contract_type {
            ContractType::Electric => &mut tables.electric,
            ContractType::Gas => &mut tables.gas,
        };
        table.insert(detail.key.contract_id.clone(), detail);
    }

    pub async fn put_objection(&self, record: ObjectionRecord) {
        let mut tables = self.tables.write().await;
        tables
            .objections
            .retain(|existing| existing.key != record.key);
        tables.objections.push(record);
    }

    pub async fn status_record(&self, key: &ContractKey) -> Option<ContractStatusRecord> {
        self.tables.read().await.statuses.get(key).cloned()
    }

    pub async fn status_of(&self, key: &ContractKey) -> Option<String> {
        self.status_record(key).await.map(|record| record.status)
    }

    pub async fn overdue_entries(&self) -> Vec<OverdueEntry> {
        self.tables.read().await.overdue.values().cloned().collect()
    }

    /// Row counts per table, for startup logging.
    pub async fn table_sizes(&self) -> BTreeMap<&'static str, usize> {
        let tables = self.tables.read().await;
        BTreeMap::from([
            ("statuses", tables.statuses.len()),
            ("commission", tables.commissions.len()),
            ("electric", tables.electric.len()),
            ("gas", tables.gas.len()),
            ("objections", tables.objections.len()),
            ("overdue", tables.overdue.len()),
        ])
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn fetch_by_status(
        &self,
        query: &StatusQuery,
    ) -> Result<Vec<ContractStatusRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .statuses
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    async fn fetch_commission(
        &self,
        key: &ContractKey,
    ) -> Result<Option<CommissionRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut fallback = None;
        for row in tables
            .commissions
            .iter()
            .filter(|row| row.contract_id == key.contract_id)
        {
            if row.contract_type == Some(key.contract_type) {
                return Ok(Some(row.clone()));
            }
            fallback.get_or_insert(row);
        }
        Ok(fallback.cloned())
    }

    async fn fetch_contract_detail(
        &self,
        key: &ContractKey,
    ) -> Result<Option<ContractDetail>, StoreError> {
        let tables = self.tables.read().await;
        let table = match key.contract_type {
            ContractType::Electric => &tables.electric,
            ContractType::Gas => &tables.gas,
        };
        Ok(table.get(&key.contract_id).cloned())
    }

    async fn fetch_objection(
        &self,
        contract_id: &ContractId,
        contract_type: Option<ContractType>,
    ) -> Result<Option<ObjectionRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .objections
            .iter()
            .find(|row| {
                &row.key.contract_id == contract_id
                    && contract_type
                        .map(|wanted| row.key.contract_type == wanted)
                        .unwrap_or(true)
            })
            .cloned())
    }

    async fn batch_update_statuses(
        &self,
        keys: &[ContractKey],
        expected_status: &str,
        new_status: &str,
        modified_at: DateTime<Local>,
    ) -> Result<Vec<ContractKey>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut affected = Vec::new();
        for key in keys {
            if let Some(record) = tables.statuses.get_mut(key) {
                if record.status == expected_status {
                    record.status = new_status.to_string();
                    record.last_modified = modified_at;
                    affected.push(key.clone());
                }
            }
        }
        Ok(affected)
    }

    async fn insert_overdue_if_absent(
        &self,
        entries: &[OverdueEntry],
    ) -> Result<Vec<ContractKey>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut inserted = Vec::new();
        for entry in entries {
            if !tables.overdue.contains_key(&entry.key) {
                tables.overdue.insert(entry.key.clone(), entry.clone());
                inserted.push(entry.key.clone());
            }
        }
        Ok(inserted)
    }
}

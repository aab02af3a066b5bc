use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::audit::{AuditHandle, AuditLog, AuditSummary, ContractChange};
use super::dates::SupplementaryData;
use super::domain::{ContractId, ContractKey, ContractStatusRecord, OverdueEntry};
use super::store::{ContractStore, StatusQuery, StoreError};
use super::transitions::{Decision, RuleConfigError, RuleKind, SupplierPolicy, TransitionRule};

const PROGRESS_INTERVAL: usize = 50;

/// One candidate's evaluation, kept for replay and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateDecision {
    pub key: ContractKey,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Outcome of a single rule run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub rule: String,
    #[serde(skip)]
    pub kind: RuleKind,
    #[serde(skip)]
    pub source_status: String,
    #[serde(skip)]
    pub target_status: Option<String>,
    pub total_source: usize,
    pub matched_count: usize,
    pub updated_count: usize,
    pub processed_at: DateTime<Local>,
    pub updated_ids: Vec<ContractId>,
    #[serde(skip)]
    pub updated_keys: Vec<ContractKey>,
    #[serde(skip)]
    pub decisions: Vec<CandidateDecision>,
}

impl RunResult {
    fn empty(rule: &TransitionRule, processed_at: DateTime<Local>) -> Self {
        Self {
            rule: rule.kind.name().to_string(),
            kind: rule.kind,
            source_status: rule.source_status.clone(),
            target_status: rule.target_status.clone(),
            total_source: 0,
            matched_count: 0,
            updated_count: 0,
            processed_at,
            updated_ids: Vec::new(),
            updated_keys: Vec::new(),
            decisions: Vec::new(),
        }
    }

    /// Rows that qualified but were not written.
    pub fn unapplied(&self) -> usize {
        self.matched_count.saturating_sub(self.updated_count)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid rule configuration: {0}")]
    Validation(#[from] RuleConfigError),
    #[error("data store failure while {stage}")]
    Store {
        stage: &'static str,
        #[source]
        source: StoreError,
    },
}

impl RunError {
    fn store(stage: &'static str) -> impl FnOnce(StoreError) -> RunError {
        move |source| RunError::Store { stage, source }
    }
}

/// Executes any transition rule against a store, writing the audit trail as it goes.
pub struct TransitionRunner<S, L> {
    store: Arc<S>,
    audit: Arc<L>,
    policy: Arc<SupplierPolicy>,
}

impl<S, L> Clone for TransitionRunner<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            audit: Arc::clone(&self.audit),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<S, L> TransitionRunner<S, L>
where
    S: ContractStore,
    L: AuditLog,
{
    pub fn new(store: Arc<S>, audit: Arc<L>, policy: Arc<SupplierPolicy>) -> Self {
        Self {
            store,
            audit,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<L> {
        &self.audit
    }

    pub fn policy(&self) -> &SupplierPolicy {
        &self.policy
    }

    /// Runs `rule` as of `current_date`. Validation happens before any store access;
    /// a store failure aborts the run and is returned after being logged.
    pub async fn run(
        &self,
        rule: &TransitionRule,
        current_date: NaiveDate,
    ) -> Result<RunResult, RunError> {
        rule.validate()?;

        let started = Instant::now();
        let log = self.audit.start_run(rule.kind.name());
        self.audit
            .append(&log, &format!("Current Date: {}", current_date.format("%Y-%m-%d")));
        self.audit.append(
            &log,
            &format!(
                "Transition: {} -> {}",
                rule.source_status,
                rule.target_label()
            ),
        );

        match self.execute(rule, current_date, &log, started).await {
            Ok(result) => {
                info!(
                    rule = %rule.kind,
                    total = result.total_source,
                    matched = result.matched_count,
                    updated = result.updated_count,
                    "transition run completed"
                );
                Ok(result)
            }
            Err(err) => {
                error!(rule = %rule.kind, error = %err, "transition run failed");
                self.audit.append_error(&log, "Handler execution failed", &err);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        rule: &TransitionRule,
        current_date: NaiveDate,
        log: &AuditHandle,
        started: Instant,
    ) -> Result<RunResult, RunError> {
        let processed_at = Local::now();
        let mut result = RunResult::empty(rule, processed_at);

        let candidates = self
            .store
            .fetch_by_status(&StatusQuery::status(rule.source_status.as_str()))
            .await
            .map_err(RunError::store("fetching candidates"))?;
        result.total_source = candidates.len();
        self.audit.append(
            log,
            &format!(
                "Found {} contracts with status '{}'",
                candidates.len(),
                rule.source_status
            ),
        );

        if candidates.is_empty() {
            self.audit.append(log, "No contracts to process");
            self.summarize(log, &result, started);
            return Ok(result);
        }

        let mut reasons: HashMap<ContractKey, String> = HashMap::new();
        let mut qualifying: Vec<&ContractStatusRecord> = Vec::new();

        for (index, record) in candidates.iter().enumerate() {
            if index > 0 && index % PROGRESS_INTERVAL == 0 {
                self.audit.append(
                    log,
                    &format!(
                        "Progress: {index}/{} contracts checked, {} qualified",
                        candidates.len(),
                        qualifying.len()
                    ),
                );
            }

            let data = self.load_supplementary(rule.kind, &record.key).await?;
            let decision = rule.qualifies(record, &data, current_date, &self.policy);
            let verdict = if decision.qualified() {
                "QUALIFIES"
            } else {
                "SKIPPED"
            };
            self.audit.append(
                log,
                &format!(
                    "EId: {} | Type: {} | {verdict}: {}",
                    record.key.contract_id,
                    record.key.contract_type,
                    decision.reason()
                ),
            );
            debug!(
                rule = %rule.kind,
                contract_id = %record.key.contract_id,
                qualified = decision.qualified(),
                reason = decision.reason(),
                "candidate evaluated"
            );

            if decision.qualified() {
                reasons.insert(record.key.clone(), decision.reason().to_string());
                qualifying.push(record);
            }
            result.decisions.push(CandidateDecision {
                key: record.key.clone(),
                decision,
            });
        }

        result.matched_count = qualifying.len();
        self.audit.append(
            log,
            &format!(
                "{} of {} contracts qualified",
                result.matched_count, result.total_source
            ),
        );

        if qualifying.is_empty() {
            self.summarize(log, &result, started);
            return Ok(result);
        }

        let keys: Vec<ContractKey> = qualifying.iter().map(|record| record.key.clone()).collect();
        let written = match rule.target_status.as_deref() {
            Some(target) if rule.kind.changes_status() => {
                self.apply_status_change(rule, target, &keys, &reasons, log)
                    .await?
            }
            _ => self.record_overdue(&keys, current_date, log).await?,
        };

        result.updated_count = written.len();
        result.updated_ids = written.iter().map(|key| key.contract_id.clone()).collect();
        result.updated_keys = written;

        if result.unapplied() > 0 {
            warn!(
                rule = %rule.kind,
                matched = result.matched_count,
                updated = result.updated_count,
                "some qualifying contracts were not written"
            );
            self.audit.append(
                log,
                &format!(
                    "WARNING: {} qualifying contracts were not written (already present, modified concurrently or removed)",
                    result.unapplied()
                ),
            );
        }

        self.summarize(log, &result, started);
        Ok(result)
    }

    async fn load_supplementary(
        &self,
        kind: RuleKind,
        key: &ContractKey,
    ) -> Result<SupplementaryData, RunError> {
        let needs = kind.requirements();
        let mut data = SupplementaryData::default();

        if needs.commission {
            data.commission = self
                .store
                .fetch_commission(key)
                .await
                .map_err(RunError::store("loading commission record"))?;
        }
        if needs.detail {
            data.detail = self
                .store
                .fetch_contract_detail(key)
                .await
                .map_err(RunError::store("loading contract detail"))?;
        }
        if needs.objection {
            data.objection = self
                .store
                .fetch_objection(&key.contract_id, Some(key.contract_type))
                .await
                .map_err(RunError::store("loading objection record"))?;
        }

        Ok(data)
    }

    async fn apply_status_change(
        &self,
        rule: &TransitionRule,
        target: &str,
        keys: &[ContractKey],
        reasons: &HashMap<ContractKey, String>,
        log: &AuditHandle,
    ) -> Result<Vec<ContractKey>, RunError> {
        let written = self
            .store
            .batch_update_statuses(keys, &rule.source_status, target, Local::now())
            .await
            .map_err(RunError::store("persisting status updates"))?;

        for key in &written {
            let reason = reasons.get(key).map(String::as_str).unwrap_or_default();
            self.audit.append_change(
                log,
                &ContractChange {
                    key,
                    previous: &rule.source_status,
                    new: target,
                    reason,
                },
            );
        }
        self.audit.append(
            log,
            &format!("Updated {} contracts to '{target}'", written.len()),
        );
        Ok(written)
    }

    async fn record_overdue(
        &self,
        keys: &[ContractKey],
        current_date: NaiveDate,
        log: &AuditHandle,
    ) -> Result<Vec<ContractKey>, RunError> {
        let entries: Vec<OverdueEntry> = keys
            .iter()
            .map(|key| OverdueEntry {
                key: key.clone(),
                detected_date: current_date,
            })
            .collect();

        let inserted = self
            .store
            .insert_overdue_if_absent(&entries)
            .await
            .map_err(RunError::store("recording overdue entries"))?;

        let newly_recorded: HashSet<&ContractKey> = inserted.iter().collect();
        for key in keys {
            let line = if newly_recorded.contains(key) {
                format!(
                    "Inserted overdue record: EId: {} | Type: {}",
                    key.contract_id, key.contract_type
                )
            } else {
                format!(
                    "Already in overdue ledger: EId: {} | Type: {}",
                    key.contract_id, key.contract_type
                )
            };
            self.audit.append(log, &line);
        }
        Ok(inserted)
    }

    fn summarize(&self, log: &AuditHandle, result: &RunResult, started: Instant) {
        self.audit.append_summary(
            log,
            &AuditSummary {
                total: result.total_source,
                matched: result.matched_count,
                updated: result.updated_count,
                elapsed: started.elapsed(),
            },
        );
    }
}

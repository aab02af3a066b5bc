use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;

use super::audit::AuditLog;
use super::runner::{RunError, RunResult, TransitionRunner};
use super::store::ContractStore;
use super::transitions::{
    RuleConfigError, RuleKind, SupplierPolicy, TransitionRule, DEFAULT_RENEWAL_WINDOW_DAYS,
};

/// The configured rule for every kind the service can trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCatalog {
    rules: HashMap<RuleKind, TransitionRule>,
}

impl RuleCatalog {
    pub fn standard(renewal_window_days: i64) -> Self {
        let rules = RuleKind::ALL
            .into_iter()
            .map(|kind| {
                let rule = TransitionRule::standard(kind);
                let rule = if kind == RuleKind::RenewalWindow {
                    rule.with_days_threshold(renewal_window_days)
                } else {
                    rule
                };
                (kind, rule)
            })
            .collect();
        Self { rules }
    }

    /// Replaces the rule for its kind.
    pub fn with_rule(mut self, rule: TransitionRule) -> Self {
        self.rules.insert(rule.kind, rule);
        self
    }

    pub fn rule(&self, kind: RuleKind) -> Option<&TransitionRule> {
        self.rules.get(&kind)
    }

    /// Validates every configured rule, returning the first failure.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        RuleKind::ALL
            .into_iter()
            .filter_map(|kind| self.rules.get(&kind))
            .try_for_each(TransitionRule::validate)
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::standard(DEFAULT_RENEWAL_WINDOW_DAYS)
    }
}

/// Successful trigger, carrying what the response message needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    pub kind: RuleKind,
    pub requested_date: Option<NaiveDate>,
    pub result: RunResult,
}

impl TriggerOutcome {
    pub fn message(&self) -> String {
        let body = if self.kind.changes_status() {
            format!(
                "Successfully updated {} contracts to {}",
                self.result.updated_count,
                self.result.target_status.as_deref().unwrap_or_default()
            )
        } else {
            format!(
                "Successfully identified {} overdue contracts. Inserted {} new records.",
                self.result.matched_count, self.result.updated_count
            )
        };

        match self.requested_date {
            Some(date) => format!(
                "Successfully processed contracts for {}. {body}",
                date.format("%Y-%m-%d")
            ),
            None => body,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("no rule configured for {0}")]
    UnknownRule(RuleKind),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl TriggerError {
    /// Client-side mistakes, as opposed to failures inside the engine or store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TriggerError::InvalidDate(_) | TriggerError::Run(RunError::Validation(_))
        )
    }
}

/// Entry point for triggering rule runs: resolves the rule and the effective date.
pub struct PostSalesService<S, L> {
    runner: TransitionRunner<S, L>,
    catalog: Arc<RuleCatalog>,
}

impl<S, L> Clone for PostSalesService<S, L> {
    fn clone(&self) -> Self {
        Self {
            runner: self.runner.clone(),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S, L> PostSalesService<S, L>
where
    S: ContractStore,
    L: AuditLog,
{
    pub fn new(
        store: Arc<S>,
        audit: Arc<L>,
        policy: Arc<SupplierPolicy>,
        catalog: RuleCatalog,
    ) -> Self {
        Self {
            runner: TransitionRunner::new(store, audit, policy),
            catalog: Arc::new(catalog),
        }
    }

    pub fn runner(&self) -> &TransitionRunner<S, L> {
        &self.runner
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Runs one rule. Without an explicit date the local wall-clock date is used.
    pub async fn trigger(
        &self,
        kind: RuleKind,
        date: Option<NaiveDate>,
    ) -> Result<TriggerOutcome, TriggerError> {
        let rule = self
            .catalog
            .rule(kind)
            .ok_or(TriggerError::UnknownRule(kind))?;
        let current_date = date.unwrap_or_else(|| Local::now().date_naive());
        info!(rule = %kind, %current_date, explicit = date.is_some(), "triggering rule");

        let result = self.runner.run(rule, current_date).await?;
        Ok(TriggerOutcome {
            kind,
            requested_date: date,
            result,
        })
    }

    /// Parses a `YYYY-MM-DD` date before triggering.
    pub async fn trigger_for(
        &self,
        kind: RuleKind,
        raw_date: &str,
    ) -> Result<TriggerOutcome, TriggerError> {
        let date = parse_trigger_date(raw_date)?;
        self.trigger(kind, Some(date)).await
    }
}

pub fn parse_trigger_date(raw: &str) -> Result<NaiveDate, TriggerError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TriggerError::InvalidDate(raw.to_string()))
}

use serde::{Deserialize, Serialize};

use super::RuleKind;
use crate::workflows::post_sales::domain::status;

pub const DEFAULT_RENEWAL_WINDOW_DAYS: i64 = 180;

/// Configured transition rule: which status it reads, which it writes, and any
/// rule-specific threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub kind: RuleKind,
    pub source_status: String,
    /// `None` for rules that record a ledger entry instead of changing status.
    pub target_status: Option<String>,
    pub days_threshold: Option<i64>,
}

impl TransitionRule {
    /// Production wiring for a rule kind.
    pub fn standard(kind: RuleKind) -> Self {
        let (source, target) = match kind {
            RuleKind::FutureToPresent => (
                status::PROCESSING_FUTURE_MONTHS,
                Some(status::PROCESSING_PRESENT_MONTH),
            ),
            RuleKind::RenewalWindow => (status::LIVE, Some(status::RENEWAL_WINDOW)),
            RuleKind::ContractEndedAgLost => (
                status::RENEWAL_WINDOW_AG_LOST,
                Some(status::CONTRACT_ENDED_AG_LOST),
            ),
            RuleKind::ContractEndedNotRenewed => (
                status::RENEWAL_WINDOW,
                Some(status::CONTRACT_ENDED_NOT_RENEWED),
            ),
            RuleKind::ContractEndedRenewed => {
                (status::RENEWED, Some(status::CONTRACT_ENDED_RENEWED))
            }
            RuleKind::ObjectionDate | RuleKind::ObjectionCount => {
                (status::OBJECTION, Some(status::OBJECTION_CLOSED))
            }
            RuleKind::Overdue => (status::PROCESSING_PRESENT_MONTH, None),
        };

        Self {
            kind,
            source_status: source.to_string(),
            target_status: target.map(str::to_string),
            days_threshold: (kind == RuleKind::RenewalWindow)
                .then_some(DEFAULT_RENEWAL_WINDOW_DAYS),
        }
    }

    pub fn with_days_threshold(mut self, days: i64) -> Self {
        self.days_threshold = Some(days);
        self
    }

    /// Checks the configuration before any store access.
    pub fn validate(&self) -> Result<(), RuleConfigError> {
        if self.source_status.trim().is_empty() {
            return Err(RuleConfigError::MissingSourceStatus(self.kind));
        }

        if self.kind.changes_status() {
            let has_target = self
                .target_status
                .as_deref()
                .map(|target| !target.trim().is_empty())
                .unwrap_or(false);
            if !has_target {
                return Err(RuleConfigError::MissingTargetStatus(self.kind));
            }
        }

        if self.kind == RuleKind::RenewalWindow {
            match self.days_threshold {
                Some(days) if days > 0 => {}
                other => {
                    return Err(RuleConfigError::InvalidThreshold {
                        kind: self.kind,
                        value: other,
                    })
                }
            }
        }

        Ok(())
    }

    pub fn target_label(&self) -> &str {
        self.target_status.as_deref().unwrap_or("Overdue ledger")
    }
}

/// Rejected rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleConfigError {
    #[error("{0} rule requires a non-empty source status")]
    MissingSourceStatus(RuleKind),
    #[error("{0} rule requires a non-empty target status")]
    MissingTargetStatus(RuleKind),
    #[error("{kind} rule requires a positive days threshold (got {value:?})")]
    InvalidThreshold { kind: RuleKind, value: Option<i64> },
}

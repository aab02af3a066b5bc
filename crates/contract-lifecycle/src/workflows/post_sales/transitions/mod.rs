mod config;
mod policy;
mod rules;

pub use config::{RuleConfigError, TransitionRule, DEFAULT_RENEWAL_WINDOW_DAYS};
pub use policy::{SupplierPolicy, DEFAULT_MAX_OBJECTION_COUNT};

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::SupplementaryData;
use super::domain::ContractStatusRecord;

/// The lifecycle rules the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    FutureToPresent,
    RenewalWindow,
    ContractEndedAgLost,
    ContractEndedNotRenewed,
    ContractEndedRenewed,
    ObjectionDate,
    ObjectionCount,
    Overdue,
}

impl RuleKind {
    pub const ALL: [Self; 8] = [
        Self::FutureToPresent,
        Self::RenewalWindow,
        Self::ContractEndedAgLost,
        Self::ContractEndedNotRenewed,
        Self::ContractEndedRenewed,
        Self::ObjectionDate,
        Self::ObjectionCount,
        Self::Overdue,
    ];

    /// Name used for audit log files and summaries.
    pub const fn name(self) -> &'static str {
        match self {
            Self::FutureToPresent => "ProcessingPresentContracts",
            Self::RenewalWindow => "RenewalWindowDate",
            Self::ContractEndedAgLost => "ContractEndedAgLostDate",
            Self::ContractEndedNotRenewed => "ContractEndedNotRenewedDate",
            Self::ContractEndedRenewed => "ContractEndedRenewedDate",
            Self::ObjectionDate => "ObjectionDate",
            Self::ObjectionCount => "ObjectionCount",
            Self::Overdue => "OverduePresentContracts",
        }
    }

    /// Route segment for the trigger endpoint.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::FutureToPresent => "processing-present-contracts",
            Self::RenewalWindow => "renewal-window-date",
            Self::ContractEndedAgLost => "contract-ended-ag-lost-date",
            Self::ContractEndedNotRenewed => "contract-ended-not-renewed-date",
            Self::ContractEndedRenewed => "contract-ended-renewed-date",
            Self::ObjectionDate => "objection-date",
            Self::ObjectionCount => "objection-count",
            Self::Overdue => "overdue-present-contracts",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Phrase completing "Failed to ..." in trigger error messages.
    pub const fn operation(self) -> &'static str {
        match self {
            Self::FutureToPresent => "process present month contracts",
            Self::RenewalWindow => "process renewal window date contracts",
            Self::ContractEndedAgLost => "process contract ended ag lost date contracts",
            Self::ContractEndedNotRenewed => {
                "process contract ended not renewed date contracts"
            }
            Self::ContractEndedRenewed => "process contract ended renewed date contracts",
            Self::ObjectionDate => "process objection date contracts",
            Self::ObjectionCount => "process objection count contracts",
            Self::Overdue => "process overdue contracts",
        }
    }

    /// `false` for the overdue rule, which appends to the ledger instead.
    pub const fn changes_status(self) -> bool {
        !matches!(self, Self::Overdue)
    }

    pub const fn requirements(self) -> DataRequirements {
        match self {
            Self::FutureToPresent | Self::Overdue => DataRequirements {
                commission: true,
                detail: true,
                objection: false,
            },
            Self::RenewalWindow
            | Self::ContractEndedAgLost
            | Self::ContractEndedNotRenewed
            | Self::ContractEndedRenewed => DataRequirements {
                commission: true,
                detail: false,
                objection: false,
            },
            Self::ObjectionDate => DataRequirements {
                commission: false,
                detail: false,
                objection: true,
            },
            Self::ObjectionCount => DataRequirements {
                commission: false,
                detail: true,
                objection: true,
            },
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supplementary lookups a rule needs per candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequirements {
    pub commission: bool,
    pub detail: bool,
    pub objection: bool,
}

/// Outcome of evaluating one candidate against a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Qualified { reason: String },
    Declined { reason: String },
}

impl Decision {
    pub fn qualified(&self) -> bool {
        matches!(self, Decision::Qualified { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Qualified { reason } | Decision::Declined { reason } => reason,
        }
    }
}

impl TransitionRule {
    /// Pure qualification test. Missing or unparseable inputs decline; they never error.
    pub fn qualifies(
        &self,
        record: &ContractStatusRecord,
        data: &SupplementaryData,
        current_date: NaiveDate,
        policy: &SupplierPolicy,
    ) -> Decision {
        match self.kind {
            RuleKind::FutureToPresent => rules::start_date_in_current_month(data, current_date),
            RuleKind::RenewalWindow => rules::end_date_within_window(
                data,
                current_date,
                self.days_threshold.unwrap_or(DEFAULT_RENEWAL_WINDOW_DAYS),
            ),
            RuleKind::ContractEndedAgLost
            | RuleKind::ContractEndedNotRenewed
            | RuleKind::ContractEndedRenewed => rules::end_date_is_today(data, current_date),
            RuleKind::ObjectionDate => rules::objection_date_elapsed(data, current_date),
            RuleKind::ObjectionCount => rules::objection_ceiling_reached(record, data, policy),
            RuleKind::Overdue => rules::start_date_passed(data, current_date),
        }
    }
}

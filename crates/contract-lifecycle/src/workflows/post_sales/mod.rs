//! Post-sales contract lifecycle engine.
//!
//! Scheduled rules move energy supply contracts between lifecycle statuses based on
//! dates held in the commission, contract-detail and objection tables. Every rule
//! runs through the same [`TransitionRunner`]; the rules only differ in their
//! qualification predicate and their source/target statuses.

pub mod audit;
pub mod dates;
pub mod domain;
pub mod import;
pub mod response;
pub mod router;
pub mod runner;
pub mod service;
pub mod store;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use audit::{
    AuditHandle, AuditLog, AuditSummary, ContractChange, FileAuditLog, InMemoryAuditLog,
    TracingAuditLog,
};
pub use dates::{parse_contract_date, DateSource, ResolvedDate, SupplementaryData};
pub use domain::{
    status, CommissionRecord, ContractDetail, ContractId, ContractKey, ContractStatusRecord,
    ContractType, ObjectionRecord, OverdueEntry,
};
pub use import::{SeedData, SeedImportError};
pub use response::ApiResponse;
pub use router::post_sales_router;
pub use runner::{CandidateDecision, RunError, RunResult, TransitionRunner};
pub use service::{PostSalesService, RuleCatalog, TriggerError, TriggerOutcome};
pub use store::{ContractStore, InMemoryContractStore, StatusQuery, StoreError};
pub use transitions::{
    Decision, RuleConfigError, RuleKind, SupplierPolicy, TransitionRule,
    DEFAULT_MAX_OBJECTION_COUNT, DEFAULT_RENEWAL_WINDOW_DAYS,
};

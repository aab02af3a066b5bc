use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Opaque contract identifier (EId), unique within a contract type.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub String);

impl ContractId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supply contract commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractType {
    Electric,
    Gas,
}

impl ContractType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electric => "Electric",
            Self::Gas => "Gas",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown contract type '{0}'")]
pub struct UnknownContractType(pub String);

impl FromStr for ContractType {
    type Err = UnknownContractType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("electric") {
            Ok(Self::Electric)
        } else if trimmed.eq_ignore_ascii_case("gas") {
            Ok(Self::Gas)
        } else {
            Err(UnknownContractType(trimmed.to_string()))
        }
    }
}

/// Identity of a status record: `(EId, type)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    pub contract_id: ContractId,
    pub contract_type: ContractType,
}

impl ContractKey {
    pub fn new(contract_id: impl Into<String>, contract_type: ContractType) -> Self {
        Self {
            contract_id: ContractId::new(contract_id),
            contract_type,
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.contract_id, self.contract_type)
    }
}

/// Well-known post-sales status labels. The vocabulary is open, so records carry
/// plain strings and these constants only name the values the rules care about.
pub mod status {
    pub const PENDING: &str = "Pending";
    pub const PROCESSING_PRESENT_MONTH: &str = "Processing_Present Month";
    pub const PROCESSING_FUTURE_MONTHS: &str = "Processing_Future Months";
    pub const OBJECTION: &str = "Objection";
    pub const OBJECTION_CLOSED: &str = "Objection Closed";
    pub const REAPPLIED: &str = "Reapplied";
    pub const NEW_LIVES: &str = "New Lives";
    pub const LIVE: &str = "Live";
    pub const RENEWAL_WINDOW: &str = "Renewal Window";
    pub const RENEWAL_WINDOW_AG_LOST: &str = "Renewal Window - Ag Lost";
    pub const RENEWED: &str = "Renewed";
    pub const POSSIBLE_LOSS: &str = "Possible Loss";
    pub const LOST: &str = "Lost";
    pub const CREDIT_FAILED: &str = "Credit Failed";
    pub const REJECTED: &str = "Rejected";
    pub const TO_BE_RESOLVED: &str = "To Be Resolved - Cobana";
    pub const WAITING_AGENT: &str = "Waiting Agent";
    pub const WAITING_SUPPLIER: &str = "Waiting Supplier";
    pub const CONTRACT_ENDED_AG_LOST: &str = "Contract Ended - Ag Lost";
    pub const CONTRACT_ENDED_NOT_RENEWED: &str = "Contract Ended - Not Renewed";
    pub const CONTRACT_ENDED_RENEWED: &str = "Contract Ended - Renewed";
}

/// Per-contract lifecycle status row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStatusRecord {
    pub key: ContractKey,
    pub status: String,
    pub last_modified: DateTime<Local>,
    pub creation_date: Option<DateTime<Local>>,
}

/// Commission & reconciliation row. Dates stay string-encoded as stored upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub contract_id: ContractId,
    pub contract_type: Option<ContractType>,
    pub start_date: Option<String>,
    pub contract_end_date: Option<String>,
    pub contract_end_date_cot: Option<String>,
}

/// Electric or gas contract detail. `meter_identifier` is the MPAN or MPRN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDetail {
    pub key: ContractKey,
    pub initial_start_date: Option<String>,
    pub business_name: Option<String>,
    pub meter_identifier: Option<String>,
    pub supplier_id: Option<i64>,
}

impl ContractDetail {
    /// Supplier id, treating the legacy `0` placeholder as absent.
    pub fn resolved_supplier_id(&self) -> Option<i64> {
        self.supplier_id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectionRecord {
    pub key: ContractKey,
    pub objection_date: Option<String>,
    pub objection_count: u32,
    pub query_type: Option<String>,
}

/// Overdue ledger row, unique per `(EId, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub key: ContractKey,
    pub detected_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_type_parses_case_insensitively() {
        assert_eq!("electric".parse::<ContractType>(), Ok(ContractType::Electric));
        assert_eq!(" GAS ".parse::<ContractType>(), Ok(ContractType::Gas));
        assert_eq!(
            "Water".parse::<ContractType>(),
            Err(UnknownContractType("Water".to_string()))
        );
    }

    #[test]
    fn zero_supplier_id_counts_as_missing() {
        let mut detail = ContractDetail {
            key: ContractKey::new("E1", ContractType::Electric),
            initial_start_date: None,
            business_name: None,
            meter_identifier: None,
            supplier_id: Some(0),
        };
        assert_eq!(detail.resolved_supplier_id(), None);
        detail.supplier_id = Some(10064);
        assert_eq!(detail.resolved_supplier_id(), Some(10064));
    }
}

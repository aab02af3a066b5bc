//! Date resolution for the string-encoded dates held by upstream tables.
//!
//! Legacy rows mix several layouts. Exact formats are tried in a fixed order and the
//! first match wins, so `03/04/2024` always resolves day-first (3 April). Anything
//! else goes through a small set of locale-independent layouts before giving up.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::domain::{CommissionRecord, ContractDetail, ObjectionRecord};

/// Exact layouts in priority order.
pub const EXACT_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%m-%d-%Y", "%Y/%m/%d",
];

const FALLBACK_DATE_FORMATS: [&str; 6] = [
    "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y", "%Y.%m.%d", "%d.%m.%Y",
];

const FALLBACK_DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

/// Parses a stored date string to a calendar date, discarding any time-of-day.
///
/// Returns `None` for blank or unparseable input; callers treat that as
/// "rule does not apply".
pub fn parse_contract_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    EXACT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| parse_general(value))
}

fn parse_general(value: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc2822(value) {
        return Some(timestamp.date_naive());
    }

    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        })
}

/// Supplementary rows fetched for one candidate. Any of them may be missing.
#[derive(Debug, Clone, Default)]
pub struct SupplementaryData {
    pub commission: Option<CommissionRecord>,
    pub detail: Option<ContractDetail>,
    pub objection: Option<ObjectionRecord>,
}

/// A field a rule may read a date from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSource {
    CommissionStartDate,
    CommissionEndDate,
    DetailInitialStartDate,
    ObjectionDate,
}

impl DateSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CommissionStartDate => "commission StartDate",
            Self::CommissionEndDate => "commission CED",
            Self::DetailInitialStartDate => "contract InitialStartDate",
            Self::ObjectionDate => "objection ObjectionDate",
        }
    }

    fn raw<'a>(self, data: &'a SupplementaryData) -> Option<&'a str> {
        let value = match self {
            Self::CommissionStartDate => data.commission.as_ref()?.start_date.as_deref(),
            Self::CommissionEndDate => data.commission.as_ref()?.contract_end_date.as_deref(),
            Self::DetailInitialStartDate => data.detail.as_ref()?.initial_start_date.as_deref(),
            Self::ObjectionDate => data.objection.as_ref()?.objection_date.as_deref(),
        };
        value.filter(|text| !text.trim().is_empty())
    }

    pub fn resolve(self, data: &SupplementaryData) -> SourceOutcome {
        match self.raw(data) {
            None => SourceOutcome::Absent,
            Some(text) => match parse_contract_date(text) {
                Some(date) => SourceOutcome::Resolved(date),
                None => SourceOutcome::Unparseable(text.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Resolved(NaiveDate),
    /// Row or field missing; the next source in the chain is consulted.
    Absent,
    /// Field present but not a date; the chain stops here.
    Unparseable(String),
}

/// Result of walking an ordered list of date sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDate {
    Found { date: NaiveDate, source: DateSource },
    Missing,
    Unparseable { source: DateSource, raw: String },
}

impl ResolvedDate {
    pub fn describe_failure(&self) -> String {
        match self {
            ResolvedDate::Found { date, source } => format!("{} = {}", source.label(), date),
            ResolvedDate::Missing => "no date available from any source".to_string(),
            ResolvedDate::Unparseable { source, raw } => {
                format!("{} '{}' is not a recognizable date", source.label(), raw)
            }
        }
    }
}

/// Consults `sources` in priority order. A present-but-unparseable value declines
/// the whole chain rather than falling through to a lower-priority table.
pub fn resolve_first(sources: &[DateSource], data: &SupplementaryData) -> ResolvedDate {
    for source in sources {
        match source.resolve(data) {
            SourceOutcome::Resolved(date) => {
                return ResolvedDate::Found {
                    date,
                    source: *source,
                }
            }
            SourceOutcome::Absent => continue,
            SourceOutcome::Unparseable(raw) => {
                return ResolvedDate::Unparseable {
                    source: *source,
                    raw,
                }
            }
        }
    }
    ResolvedDate::Missing
}

use chrono::{Datelike, NaiveDate};

use super::policy::SupplierPolicy;
use super::Decision;
use crate::workflows::post_sales::dates::{resolve_first, DateSource, ResolvedDate, SupplementaryData};
use crate::workflows::post_sales::domain::ContractStatusRecord;

const START_DATE_SOURCES: [DateSource; 2] = [
    DateSource::CommissionStartDate,
    DateSource::DetailInitialStartDate,
];

// CED is only ever read from the commission record.
const END_DATE_SOURCES: [DateSource; 1] = [DateSource::CommissionEndDate];

const OBJECTION_DATE_SOURCES: [DateSource; 1] = [DateSource::ObjectionDate];

fn declined(reason: impl Into<String>) -> Decision {
    Decision::Declined {
        reason: reason.into(),
    }
}

fn qualified(reason: impl Into<String>) -> Decision {
    Decision::Qualified {
        reason: reason.into(),
    }
}

pub(crate) fn start_date_in_current_month(
    data: &SupplementaryData,
    current_date: NaiveDate,
) -> Decision {
    match resolve_first(&START_DATE_SOURCES, data) {
        ResolvedDate::Found { date, source } => {
            if date.month() == current_date.month() && date.year() == current_date.year() {
                qualified(format!(
                    "{} {} matches current month {:02}/{}",
                    source.label(),
                    date,
                    current_date.month(),
                    current_date.year()
                ))
            } else {
                declined(format!(
                    "{} {} is outside current month {:02}/{}",
                    source.label(),
                    date,
                    current_date.month(),
                    current_date.year()
                ))
            }
        }
        other => declined(other.describe_failure()),
    }
}

pub(crate) fn end_date_within_window(
    data: &SupplementaryData,
    current_date: NaiveDate,
    threshold_days: i64,
) -> Decision {
    match resolve_first(&END_DATE_SOURCES, data) {
        ResolvedDate::Found { date, .. } => {
            let distance = (current_date - date).num_days().abs();
            if distance <= threshold_days {
                qualified(format!(
                    "CED ({date}) is {distance} days from current date (within {threshold_days} days threshold)"
                ))
            } else {
                declined(format!(
                    "CED ({date}) is {distance} days from current date (beyond {threshold_days} days threshold)"
                ))
            }
        }
        other => declined(other.describe_failure()),
    }
}

pub(crate) fn end_date_is_today(data: &SupplementaryData, current_date: NaiveDate) -> Decision {
    match resolve_first(&END_DATE_SOURCES, data) {
        ResolvedDate::Found { date, .. } if date == current_date => {
            qualified(format!("CED ({date}) equals current date"))
        }
        ResolvedDate::Found { date, .. } => {
            declined(format!("CED ({date}) differs from current date {current_date}"))
        }
        other => declined(other.describe_failure()),
    }
}

pub(crate) fn objection_date_elapsed(
    data: &SupplementaryData,
    current_date: NaiveDate,
) -> Decision {
    if data.objection.is_none() {
        return declined("post-sale objection record not found");
    }

    match resolve_first(&OBJECTION_DATE_SOURCES, data) {
        ResolvedDate::Found { date, .. } => {
            let Some(expected) = date.succ_opt() else {
                return declined(format!("ObjectionDate ({date}) has no following day"));
            };
            if expected == current_date {
                qualified(format!(
                    "ObjectionDate ({date}) + 1 day matches current date"
                ))
            } else {
                declined(format!(
                    "ObjectionDate ({date}) + 1 day is {expected}, not {current_date}"
                ))
            }
        }
        other => declined(other.describe_failure()),
    }
}

pub(crate) fn objection_ceiling_reached(
    record: &ContractStatusRecord,
    data: &SupplementaryData,
    policy: &SupplierPolicy,
) -> Decision {
    let Some(supplier_id) = data
        .detail
        .as_ref()
        .and_then(|detail| detail.resolved_supplier_id())
    else {
        return declined(format!(
            "{} contract or supplier id not found",
            record.key.contract_type
        ));
    };

    let max_count = policy.max_objection_count(supplier_id);
    let supplier = policy.supplier_name(supplier_id).unwrap_or("unknown supplier");

    let Some(objection) = data.objection.as_ref() else {
        return declined(format!(
            "supplier {supplier} (ID: {supplier_id}) allows {max_count} objections but no post-sale objection record exists"
        ));
    };

    if objection.objection_count == max_count {
        qualified(format!(
            "ObjectionCount ({}) reached MaxObjectionCount ({max_count}) for supplier {supplier} (ID: {supplier_id})",
            objection.objection_count
        ))
    } else {
        declined(format!(
            "ObjectionCount ({}) does not equal MaxObjectionCount ({max_count}) for supplier {supplier} (ID: {supplier_id})",
            objection.objection_count
        ))
    }
}

pub(crate) fn start_date_passed(data: &SupplementaryData, current_date: NaiveDate) -> Decision {
    match resolve_first(&START_DATE_SOURCES, data) {
        ResolvedDate::Found { date, source } if current_date > date => qualified(format!(
            "{} {} has passed while still in present month processing",
            source.label(),
            date
        )),
        ResolvedDate::Found { date, source } => declined(format!(
            "{} {} has not passed yet",
            source.label(),
            date
        )),
        other => declined(other.describe_failure()),
    }
}

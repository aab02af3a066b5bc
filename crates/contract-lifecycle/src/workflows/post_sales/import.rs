//! CSV seed files for hydrating the in-memory store.
//!
//! A seed directory may hold any of `statuses.csv`, `commission.csv`,
//! `electric.csv`, `gas.csv`, `objections.csv` and `overdue.csv`. Missing files
//! load as empty tables and blank cells load as absent values.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use tracing::{debug, info};

use super::domain::{
    CommissionRecord, ContractDetail, ContractId, ContractKey, ContractStatusRecord,
    ContractType, ObjectionRecord, OverdueEntry,
};

pub const STATUSES_FILE: &str = "statuses.csv";
pub const COMMISSION_FILE: &str = "commission.csv";
pub const ELECTRIC_FILE: &str = "electric.csv";
pub const GAS_FILE: &str = "gas.csv";
pub const OBJECTIONS_FILE: &str = "objections.csv";
pub const OVERDUE_FILE: &str = "overdue.csv";

/// Rows for every table the store serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedData {
    pub statuses: Vec<ContractStatusRecord>,
    pub commissions: Vec<CommissionRecord>,
    pub details: Vec<ContractDetail>,
    pub objections: Vec<ObjectionRecord>,
    pub overdue: Vec<OverdueEntry>,
}

impl SeedData {
    pub fn from_dir(dir: &Path) -> Result<Self, SeedImportError> {
        if !dir.is_dir() {
            return Err(SeedImportError::MissingDirectory(dir.to_path_buf()));
        }

        let mut seed = SeedData::default();
        if let Some(reader) = open_optional(dir, STATUSES_FILE)? {
            seed.statuses = parse_statuses(reader)?;
        }
        if let Some(reader) = open_optional(dir, COMMISSION_FILE)? {
            seed.commissions = parse_commissions(reader)?;
        }
        if let Some(reader) = open_optional(dir, ELECTRIC_FILE)? {
            seed.details
                .extend(parse_details(reader, ContractType::Electric)?);
        }
        if let Some(reader) = open_optional(dir, GAS_FILE)? {
            seed.details.extend(parse_details(reader, ContractType::Gas)?);
        }
        if let Some(reader) = open_optional(dir, OBJECTIONS_FILE)? {
            seed.objections = parse_objections(reader)?;
        }
        if let Some(reader) = open_optional(dir, OVERDUE_FILE)? {
            seed.overdue = parse_overdue(reader)?;
        }

        info!(
            dir = %dir.display(),
            statuses = seed.statuses.len(),
            commissions = seed.commissions.len(),
            details = seed.details.len(),
            objections = seed.objections.len(),
            overdue = seed.overdue.len(),
            "seed data loaded"
        );
        Ok(seed)
    }

    pub fn row_count(&self) -> usize {
        self.statuses.len()
            + self.commissions.len()
            + self.details.len()
            + self.objections.len()
            + self.overdue.len()
    }
}

fn open_optional(dir: &Path, file: &'static str) -> Result<Option<File>, SeedImportError> {
    let path = dir.join(file);
    if !path.exists() {
        debug!(path = %path.display(), "seed file absent, skipping");
        return Ok(None);
    }
    File::open(&path)
        .map(Some)
        .map_err(|source| SeedImportError::Io { path, source })
}

fn read_rows<R: Read, T: DeserializeOwned>(
    reader: R,
    file: &'static str,
) -> Result<Vec<(u64, T)>, SeedImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (index, row) in csv_reader.deserialize::<T>().enumerate() {
        let row = row.map_err(|source| SeedImportError::Csv { file, source })?;
        // header is line 1
        rows.push((index as u64 + 2, row));
    }
    Ok(rows)
}

pub fn parse_statuses<R: Read>(reader: R) -> Result<Vec<ContractStatusRecord>, SeedImportError> {
    read_rows::<_, StatusRow>(reader, STATUSES_FILE)?
        .into_iter()
        .map(|(line, row)| {
            let contract_type = contract_type(STATUSES_FILE, line, &row.contract_type)?;
            let last_modified = match row.last_modified.as_deref() {
                Some(raw) => timestamp(STATUSES_FILE, line, "LastModified", raw)?,
                None => Local::now(),
            };
            let creation_date = row
                .creation_date
                .as_deref()
                .map(|raw| timestamp(STATUSES_FILE, line, "CreationDate", raw))
                .transpose()?;

            Ok(ContractStatusRecord {
                key: ContractKey::new(row.eid, contract_type),
                status: row.status,
                last_modified,
                creation_date,
            })
        })
        .collect()
}

pub fn parse_commissions<R: Read>(reader: R) -> Result<Vec<CommissionRecord>, SeedImportError> {
    read_rows::<_, CommissionRow>(reader, COMMISSION_FILE)?
        .into_iter()
        .map(|(line, row)| {
            let contract_type = row
                .contract_type
                .as_deref()
                .map(|raw| contract_type(COMMISSION_FILE, line, raw))
                .transpose()?;
            Ok(CommissionRecord {
                contract_id: ContractId::new(row.eid),
                contract_type,
                start_date: row.start_date,
                contract_end_date: row.contract_end_date,
                contract_end_date_cot: row.contract_end_date_cot,
            })
        })
        .collect()
}

/// Detail rows for one commodity; `electric.csv` carries `MPAN`, `gas.csv` carries `MPRN`.
pub fn parse_details<R: Read>(
    reader: R,
    contract_type: ContractType,
) -> Result<Vec<ContractDetail>, SeedImportError> {
    let file = match contract_type {
        ContractType::Electric => ELECTRIC_FILE,
        ContractType::Gas => GAS_FILE,
    };
    Ok(read_rows::<_, DetailRow>(reader, file)?
        .into_iter()
        .map(|(_, row)| ContractDetail {
            key: ContractKey::new(row.eid, contract_type),
            initial_start_date: row.initial_start_date,
            business_name: row.business_name,
            meter_identifier: row.mpan.or(row.mprn),
            supplier_id: row.supplier_id,
        })
        .collect())
}

pub fn parse_objections<R: Read>(reader: R) -> Result<Vec<ObjectionRecord>, SeedImportError> {
    read_rows::<_, ObjectionRow>(reader, OBJECTIONS_FILE)?
        .into_iter()
        .map(|(line, row)| {
            Ok(ObjectionRecord {
                key: ContractKey::new(
                    row.eid,
                    contract_type(OBJECTIONS_FILE, line, &row.contract_type)?,
                ),
                objection_date: row.objection_date,
                objection_count: row.objection_count.unwrap_or(0),
                query_type: row.query_type,
            })
        })
        .collect()
}

pub fn parse_overdue<R: Read>(reader: R) -> Result<Vec<OverdueEntry>, SeedImportError> {
    read_rows::<_, OverdueRow>(reader, OVERDUE_FILE)?
        .into_iter()
        .map(|(line, row)| {
            let detected_date = NaiveDate::parse_from_str(&row.detected_date, "%Y-%m-%d")
                .map_err(|_| SeedImportError::InvalidValue {
                    file: OVERDUE_FILE,
                    line,
                    field: "DetectedDate",
                    value: row.detected_date.clone(),
                })?;
            Ok(OverdueEntry {
                key: ContractKey::new(
                    row.eid,
                    contract_type(OVERDUE_FILE, line, &row.contract_type)?,
                ),
                detected_date,
            })
        })
        .collect()
}

fn contract_type(file: &'static str, line: u64, raw: &str) -> Result<ContractType, SeedImportError> {
    raw.parse().map_err(|_| SeedImportError::InvalidValue {
        file,
        line,
        field: "Type",
        value: raw.to_string(),
    })
}

fn timestamp(
    file: &'static str,
    line: u64,
    field: &'static str,
    raw: &str,
) -> Result<DateTime<Local>, SeedImportError> {
    let invalid = || SeedImportError::InvalidValue {
        file,
        line,
        field,
        value: raw.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)
}

#[derive(Debug, Deserialize)]
struct StatusRow {
    #[serde(rename = "EId")]
    eid: String,
    #[serde(rename = "Type")]
    contract_type: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "LastModified", default, deserialize_with = "empty_string_as_none")]
    last_modified: Option<String>,
    #[serde(rename = "CreationDate", default, deserialize_with = "empty_string_as_none")]
    creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommissionRow {
    #[serde(rename = "EId")]
    eid: String,
    #[serde(rename = "Type", default, deserialize_with = "empty_string_as_none")]
    contract_type: Option<String>,
    #[serde(rename = "StartDate", default, deserialize_with = "empty_string_as_none")]
    start_date: Option<String>,
    #[serde(rename = "CED", default, deserialize_with = "empty_string_as_none")]
    contract_end_date: Option<String>,
    #[serde(rename = "CED_COT", default, deserialize_with = "empty_string_as_none")]
    contract_end_date_cot: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailRow {
    #[serde(rename = "EId")]
    eid: String,
    #[serde(rename = "InitialStartDate", default, deserialize_with = "empty_string_as_none")]
    initial_start_date: Option<String>,
    #[serde(rename = "BusinessName", default, deserialize_with = "empty_string_as_none")]
    business_name: Option<String>,
    #[serde(rename = "MPAN", default, deserialize_with = "empty_string_as_none")]
    mpan: Option<String>,
    #[serde(rename = "MPRN", default, deserialize_with = "empty_string_as_none")]
    mprn: Option<String>,
    #[serde(rename = "SupplierId", default, deserialize_with = "empty_as_none_parsed")]
    supplier_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ObjectionRow {
    #[serde(rename = "EId")]
    eid: String,
    #[serde(rename = "Type")]
    contract_type: String,
    #[serde(rename = "ObjectionDate", default, deserialize_with = "empty_string_as_none")]
    objection_date: Option<String>,
    #[serde(rename = "ObjectionCount", default, deserialize_with = "empty_as_none_parsed")]
    objection_count: Option<u32>,
    #[serde(rename = "QueryType", default, deserialize_with = "empty_string_as_none")]
    query_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverdueRow {
    #[serde(rename = "EId")]
    eid: String,
    #[serde(rename = "Type")]
    contract_type: String,
    #[serde(rename = "DetectedDate")]
    detected_date: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn empty_as_none_parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match empty_string_as_none(deserializer)? {
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeedImportError {
    #[error("seed directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{file} line {line}: invalid {field} '{value}'")]
    InvalidValue {
        file: &'static str,
        line: u64,
        field: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_types_and_timestamps() {
        let csv = "EId,Type,Status,LastModified,CreationDate\n\
                   E123,Electric,Live,2024-05-01 09:30:00,\n\
                   G9,gas,Objection,2024-05-02,2023-11-20\n";
        let rows = parse_statuses(csv.as_bytes()).expect("statuses parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, ContractKey::new("E123", ContractType::Electric));
        assert_eq!(rows[0].status, "Live");
        assert!(rows[0].creation_date.is_none());
        assert_eq!(rows[1].key.contract_type, ContractType::Gas);
        assert!(rows[1].creation_date.is_some());
    }

    #[test]
    fn blank_cells_load_as_absent() {
        let csv = "EId,Type,StartDate,CED,CED_COT\n\
                   E1,,  ,2024-06-01,\n";
        let rows = parse_commissions(csv.as_bytes()).expect("commission parses");
        assert_eq!(rows[0].contract_type, None);
        assert_eq!(rows[0].start_date, None);
        assert_eq!(rows[0].contract_end_date.as_deref(), Some("2024-06-01"));
        assert_eq!(rows[0].contract_end_date_cot, None);
    }

    #[test]
    fn details_pick_meter_column_per_commodity() {
        let electric = "EId,InitialStartDate,BusinessName,MPAN,SupplierId\n\
                        E1,01/05/2024,Acme Bakery,1200023456789,10064\n\
                        E2,,,,\n";
        let rows = parse_details(electric.as_bytes(), ContractType::Electric)
            .expect("electric parses");
        assert_eq!(rows[0].meter_identifier.as_deref(), Some("1200023456789"));
        assert_eq!(rows[0].supplier_id, Some(10064));
        assert_eq!(rows[1].supplier_id, None);

        let gas = "EId,InitialStartDate,BusinessName,MPRN,SupplierId\nG1,,Corner Cafe,7501234,0\n";
        let rows = parse_details(gas.as_bytes(), ContractType::Gas).expect("gas parses");
        assert_eq!(rows[0].key.contract_type, ContractType::Gas);
        assert_eq!(rows[0].meter_identifier.as_deref(), Some("7501234"));
        assert_eq!(rows[0].resolved_supplier_id(), None);
    }

    #[test]
    fn unknown_contract_type_reports_line() {
        let csv = "EId,Type,ObjectionDate,ObjectionCount,QueryType\n\
                   E1,Electric,2024-03-01,2,\n\
                   E2,Water,2024-03-01,1,\n";
        let err = parse_objections(csv.as_bytes()).expect_err("water is not a contract type");
        match err {
            SeedImportError::InvalidValue { line, field, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(field, "Type");
                assert_eq!(value, "Water");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = SeedData::from_dir(Path::new("/definitely/not/a/seed/dir"))
            .expect_err("directory missing");
        assert!(matches!(err, SeedImportError::MissingDirectory(_)));
    }

    #[test]
    fn directory_with_partial_files_loads() {
        let dir = std::env::temp_dir().join(format!("contract-lifecycle-seed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(
            dir.join(OVERDUE_FILE),
            "EId,Type,DetectedDate\nE1,Electric,2024-05-02\n",
        )
        .expect("write overdue seed");

        let seed = SeedData::from_dir(&dir).expect("seed loads");
        assert_eq!(seed.overdue.len(), 1);
        assert!(seed.statuses.is_empty());
        assert_eq!(seed.row_count(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}

use chrono::NaiveDate;
use contract_lifecycle::config::EngineConfig;
use contract_lifecycle::error::AppError;
use contract_lifecycle::workflows::post_sales::{
    AuditHandle, AuditLog, FileAuditLog, InMemoryContractStore, PostSalesService, RuleCatalog,
    RuleKind, SeedData, SupplierPolicy, TracingAuditLog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type EngineService = PostSalesService<InMemoryContractStore, EngineAuditLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Audit sink chosen from configuration: per-run files when a directory is set,
/// otherwise the tracing subscriber.
#[derive(Debug)]
pub(crate) enum EngineAuditLog {
    Tracing(TracingAuditLog),
    File(FileAuditLog),
}

impl EngineAuditLog {
    pub(crate) fn from_config(config: &EngineConfig) -> Self {
        match &config.audit_log_dir {
            Some(dir) => Self::File(FileAuditLog::new(dir)),
            None => Self::Tracing(TracingAuditLog::default()),
        }
    }
}

impl AuditLog for EngineAuditLog {
    fn start_run(&self, rule_name: &str) -> AuditHandle {
        match self {
            Self::Tracing(log) => log.start_run(rule_name),
            Self::File(log) => log.start_run(rule_name),
        }
    }

    fn append(&self, handle: &AuditHandle, line: &str) {
        match self {
            Self::Tracing(log) => log.append(handle, line),
            Self::File(log) => log.append(handle, line),
        }
    }
}

pub(crate) async fn load_store(seed_dir: Option<&Path>) -> Result<InMemoryContractStore, AppError> {
    let store = match seed_dir {
        Some(dir) => InMemoryContractStore::from_seed(SeedData::from_dir(dir)?),
        None => InMemoryContractStore::default(),
    };

    let sizes = store.table_sizes().await;
    info!(?sizes, "contract store ready");
    Ok(store)
}

pub(crate) async fn build_engine(
    config: &EngineConfig,
    seed_dir: Option<&Path>,
) -> Result<EngineService, AppError> {
    let catalog = RuleCatalog::standard(config.renewal_window_days);
    catalog.validate()?;

    let store = load_store(seed_dir).await?;
    Ok(PostSalesService::new(
        Arc::new(store),
        Arc::new(EngineAuditLog::from_config(config)),
        Arc::new(SupplierPolicy::standard()),
        catalog,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts a route slug (`objection-date`) or an audit rule name (`ObjectionDate`).
pub(crate) fn parse_rule(raw: &str) -> Result<RuleKind, String> {
    let trimmed = raw.trim();
    RuleKind::from_slug(trimmed)
        .or_else(|| {
            RuleKind::ALL
                .into_iter()
                .find(|kind| kind.name().eq_ignore_ascii_case(trimmed))
        })
        .ok_or_else(|| {
            let known: Vec<_> = RuleKind::ALL.iter().map(|kind| kind.slug()).collect();
            format!("unknown rule '{raw}', expected one of: {}", known.join(", "))
        })
}

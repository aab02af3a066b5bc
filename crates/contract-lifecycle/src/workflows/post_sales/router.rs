use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::warn;

use super::audit::AuditLog;
use super::response::{trigger_failure, ApiResponse};
use super::runner::RunResult;
use super::service::PostSalesService;
use super::store::ContractStore;
use super::transitions::RuleKind;

/// Router exposing `POST /api/<rule>/process` and `POST /api/<rule>/process/<yyyy-MM-dd>`
/// for every rule slug.
pub fn post_sales_router<S, L>(service: Arc<PostSalesService<S, L>>) -> Router
where
    S: ContractStore,
    L: AuditLog,
{
    Router::new()
        .route("/api/:rule/process", post(process_handler::<S, L>))
        .route(
            "/api/:rule/process/:date",
            post(process_for_date_handler::<S, L>),
        )
        .with_state(service)
}

pub(crate) async fn process_handler<S, L>(
    State(service): State<Arc<PostSalesService<S, L>>>,
    Path(rule): Path<String>,
) -> Response
where
    S: ContractStore,
    L: AuditLog,
{
    let Some(kind) = RuleKind::from_slug(&rule) else {
        return unknown_rule(&rule);
    };

    match service.trigger(kind, None).await {
        Ok(outcome) => ApiResponse::from(outcome).into_response(),
        Err(err) => {
            warn!(rule = %kind, error = %err, "trigger failed");
            trigger_failure(kind.operation(), &err).into_response()
        }
    }
}

pub(crate) async fn process_for_date_handler<S, L>(
    State(service): State<Arc<PostSalesService<S, L>>>,
    Path((rule, date)): Path<(String, String)>,
) -> Response
where
    S: ContractStore,
    L: AuditLog,
{
    let Some(kind) = RuleKind::from_slug(&rule) else {
        return unknown_rule(&rule);
    };

    match service.trigger_for(kind, &date).await {
        Ok(outcome) => ApiResponse::from(outcome).into_response(),
        Err(err) => {
            warn!(rule = %kind, %date, error = %err, "trigger failed");
            trigger_failure(kind.operation(), &err).into_response()
        }
    }
}

fn unknown_rule(slug: &str) -> Response {
    ApiResponse::<RunResult>::failure(
        StatusCode::NOT_FOUND,
        format!("Unknown rule '{slug}'"),
        Vec::new(),
    )
    .into_response()
}

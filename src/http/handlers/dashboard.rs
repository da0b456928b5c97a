use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::http::error::{render, AppResult};
use crate::http::types::AppState;
use crate::ledger;
use crate::views::DashboardPage;

const STYLESHEET: &str = include_str!("../../../assets/app.css");

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let totals = state.pool.run(|conn| ledger::dashboard_totals(conn)).await?;
    render(&DashboardPage::new(&totals))
}

pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.pool.run(|conn| ledger::ping(conn)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "database": "ok",
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "version": env!("CARGO_PKG_VERSION"),
                    "database": "unreachable",
                })),
            )
                .into_response()
        }
    }
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

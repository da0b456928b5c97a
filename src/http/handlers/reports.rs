use askama::Template;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};
use chrono::Local;
use tracing::info;

use super::parse_id;
use crate::http::error::{render, AppError, AppResult};
use crate::http::types::{AppState, ClassIdQuery};
use crate::ledger;
use crate::report::{load_fee_report, FeeReportTemplate};
use crate::views::{class_options, Nav, ReportPickerPage, Section};

pub async fn picker(State(state): State<AppState>) -> AppResult<Html<String>> {
    let classes = state.pool.run(|conn| ledger::list_classes(conn)).await?;
    render(&ReportPickerPage {
        nav: Nav::new(Section::Reports),
        classes: class_options(&classes, None),
    })
}

pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ClassIdQuery>,
) -> AppResult<Response> {
    let class_id = match query.raw() {
        Some(raw) => Some(parse_id(raw).ok_or(AppError::BadRequest("invalid class id"))?),
        None => None,
    };
    let date = Local::now().format("%d/%m/%Y").to_string();

    let report = state
        .pool
        .run(move |conn| load_fee_report(conn, class_id, &date))
        .await
        .map_err(AppError::Pdf)?;
    let html = FeeReportTemplate { report: &report }
        .render()
        .map_err(|e| AppError::Pdf(e.into()))?;
    let pdf = state
        .renderer
        .render(&html, &state.pdf)
        .await
        .map_err(AppError::Pdf)?;

    info!(class_id = ?class_id, rows = report.rows.len(), bytes = pdf.len(), "report exported");
    Ok((
        [
            (CONTENT_TYPE, "application/pdf"),
            (CONTENT_DISPOSITION, "inline; filename=student_report.pdf"),
        ],
        pdf,
    )
        .into_response())
}

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};

use super::parse_id;
use crate::http::error::{render, AppError, AppResult};
use crate::http::types::{AppState, ClassIdQuery};
use crate::ledger;
use crate::views::ClassPaymentPage;

/// Class picker. `?classId=X` is accepted only as a redirect to the
/// canonical `/classes/X`.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ClassIdQuery>,
) -> AppResult<Response> {
    if let Some(raw) = query.raw() {
        let target = format!("/classes/{}", urlencoding::encode(raw));
        return Ok(Redirect::to(&target).into_response());
    }
    let classes = state.pool.run(|conn| ledger::list_classes(conn)).await?;
    Ok(render(&ClassPaymentPage::new(&classes, None, &[]))?.into_response())
}

pub async fn show(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Html<String>> {
    let class_id = parse_id(&raw).ok_or(AppError::BadRequest("invalid class id"))?;
    let (classes, rows) = state
        .pool
        .run(move |conn| {
            Ok((
                ledger::list_classes(conn)?,
                ledger::students_in_class(conn, class_id)?,
            ))
        })
        .await?;
    if !classes.iter().any(|c| c.id == class_id) {
        return Err(AppError::NotFound);
    }
    render(&ClassPaymentPage::new(&classes, Some(class_id), &rows))
}

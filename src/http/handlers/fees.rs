use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::Form;
use tracing::{info, warn};

use crate::http::error::{render, AppResult};
use crate::http::types::AppState;
use crate::ledger;
use crate::views::{EditFeesPage, Nav, Section};

pub async fn edit_form(State(state): State<AppState>) -> AppResult<Html<String>> {
    let classes = state.pool.run(|conn| ledger::list_classes(conn)).await?;
    render(&EditFeesPage {
        nav: Nav::new(Section::Fees),
        classes,
    })
}

/// Form fields are `<class id>=<fee>` pairs.
pub async fn update_fees(
    State(state): State<AppState>,
    Form(entries): Form<Vec<(String, String)>>,
) -> AppResult<Redirect> {
    let summary = state
        .pool
        .run(move |conn| ledger::apply_fee_updates(conn, &entries))
        .await?;
    if !summary.skipped.is_empty() {
        warn!(skipped = ?summary.skipped, "fee entries skipped");
    }
    info!(applied = summary.applied, "fee schedule updated");
    Ok(Redirect::to("/"))
}

use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use chrono::Utc;
use tracing::{error, info};

use super::parse_student_id;
use super::students::load_listing;
use crate::http::error::{redirect_with, render, AppError, AppResult};
use crate::http::types::{AppState, ListingQuery, PaymentForm};
use crate::ledger::{self, format_amount, PaymentInput};
use crate::views::{
    class_options, Flash, Nav, PaymentFormPage, PaymentHistoryPage, Section, StudentListPage,
};

pub async fn picker(
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> AppResult<Html<String>> {
    let listing = load_listing(&state.pool, ListingQuery::default()).await?;
    render(&StudentListPage {
        nav: Nav::new(Section::Payments),
        flash,
        listing,
    })
}

pub async fn listing(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
    Query(flash): Query<Flash>,
) -> AppResult<Html<String>> {
    let listing = load_listing(&state.pool, query).await?;
    render(&StudentListPage {
        nav: Nav::new(Section::Payments),
        flash,
        listing,
    })
}

pub async fn pay_form(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(flash): Query<Flash>,
) -> AppResult<Html<String>> {
    let student_id = parse_student_id(&raw_id)?;
    let (student, classes) = state
        .pool
        .run(move |conn| {
            Ok((
                ledger::get_student(conn, student_id)?,
                ledger::list_classes(conn)?,
            ))
        })
        .await?;
    let student = student.ok_or(AppError::NotFound)?;
    render(&PaymentFormPage {
        nav: Nav::new(Section::Payments),
        flash,
        student_id: student.id,
        student_name: student.name.clone(),
        amount_paid: format_amount(student.amount_paid),
        classes: class_options(&classes, Some(student.class_id)),
    })
}

pub async fn pay(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<PaymentForm>,
) -> AppResult<Redirect> {
    let student_id = parse_student_id(&raw_id)?;
    let back = format!("/students/{student_id}/pay");
    let input = PaymentInput {
        class_id: &form.class_id,
        amount: &form.amount_paid,
        payment_method: &form.payment_method,
        term: &form.term,
        session: &form.session,
        note: &form.note,
        reference_code: &form.reference_code,
    };
    let Some(payment) = ledger::validate_payment(&input) else {
        info!(student_id, "payment rejected: invalid form");
        return Ok(redirect_with(
            &back,
            "error",
            "All fields are required and amount must be positive.",
        ));
    };

    let amount = payment.amount;
    match state
        .pool
        .run(move |conn| ledger::record_payment(conn, student_id, &payment, Utc::now()))
        .await
    {
        Ok(total_paid) => {
            info!(student_id, amount, total_paid, "payment recorded");
            Ok(redirect_with("/students", "success", "Payment added successfully."))
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), student_id, "payment failed");
            Ok(redirect_with(&back, "error", "Payment Failed."))
        }
    }
}

pub async fn history(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Html<String>> {
    let student_id = parse_student_id(&raw_id)?;
    let (student, payments) = state
        .pool
        .run(move |conn| {
            Ok((
                ledger::get_student(conn, student_id)?,
                ledger::payment_history(conn, student_id)?,
            ))
        })
        .await?;
    let student = student.ok_or(AppError::NotFound)?;
    render(&PaymentHistoryPage::new(&student, &payments))
}

//! Fee status report: data model, HTML template and PDF rendering.

pub mod pdf;

use askama::Template;
use rusqlite::Connection;
use std::collections::HashMap;

use crate::ledger::{self, format_amount, Class, Student};

pub use pdf::{ChromiumRenderer, PageFormat, PdfOptions, PdfRenderer};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub class_name: String,
    pub expected_display: String,
    pub paid_display: String,
    pub balance_display: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeReport {
    pub title: String,
    pub date: String,
    pub rows: Vec<ReportRow>,
    pub total_expected_display: String,
    pub total_paid_display: String,
    pub total_balance_display: String,
}

/// Joins students with their class fee and the sum of their payments.
///
/// Paid amounts come from the payments table rather than the cached
/// `amount_paid` column; a student without payments has paid zero.
pub fn build_fee_report(
    students: &[Student],
    classes: &[Class],
    paid_by_student: &HashMap<i64, f64>,
    class_id: Option<i64>,
    date: &str,
) -> FeeReport {
    let by_id: HashMap<i64, &Class> = classes.iter().map(|c| (c.id, c)).collect();

    let mut total_expected = 0i64;
    let mut total_paid = 0f64;
    let rows = students
        .iter()
        .map(|s| {
            let class = by_id.get(&s.class_id);
            let expected = class.map(|c| c.total_fees).unwrap_or(0);
            let paid = paid_by_student.get(&s.id).copied().unwrap_or(0.0);
            total_expected += expected;
            total_paid += paid;
            ReportRow {
                name: s.name.clone(),
                class_name: class.map(|c| c.name.clone()).unwrap_or_default(),
                expected_display: format_amount(expected as f64),
                paid_display: format_amount(paid),
                balance_display: format_amount(expected as f64 - paid),
            }
        })
        .collect();

    let scope = class_id
        .and_then(|id| by_id.get(&id).map(|c| c.name.clone()))
        .unwrap_or_else(|| "All Classes".to_string());

    FeeReport {
        title: format!("Student Fee Report: {scope}"),
        date: date.to_string(),
        rows,
        total_expected_display: format_amount(total_expected as f64),
        total_paid_display: format_amount(total_paid),
        total_balance_display: format_amount(total_expected as f64 - total_paid),
    }
}

/// Loads everything the report needs in one go.
pub fn load_fee_report(
    conn: &Connection,
    class_id: Option<i64>,
    date: &str,
) -> anyhow::Result<FeeReport> {
    let students = ledger::report_students(conn, class_id)?;
    let paid = ledger::payment_totals_by_student(conn)?;
    let classes = ledger::list_classes(conn)?;
    Ok(build_fee_report(&students, &classes, &paid, class_id, date))
}

#[derive(Template)]
#[template(path = "fee_report.html")]
pub struct FeeReportTemplate<'a> {
    pub report: &'a FeeReport,
}

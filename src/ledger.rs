use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub total_fees: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub class_id: i64,
    pub amount_paid: f64,
}

/// A student joined with its class, as shown in every listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub class_id: i64,
    pub class_name: String,
    pub total_fees: i64,
    pub amount_paid: f64,
}

impl StudentRow {
    pub fn balance(&self) -> f64 {
        self.total_fees as f64 - self.amount_paid
    }

    pub fn status(&self) -> FeeStatus {
        fee_status(self.total_fees as f64, self.amount_paid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeStatus {
    Paid,
    Partial,
    Unpaid,
}

impl FeeStatus {
    pub fn label(self) -> &'static str {
        match self {
            FeeStatus::Paid => "Paid",
            FeeStatus::Partial => "Partial",
            FeeStatus::Unpaid => "Unpaid",
        }
    }
}

pub fn fee_status(expected: f64, paid: f64) -> FeeStatus {
    if expected - paid <= 0.0 {
        FeeStatus::Paid
    } else if paid > 0.0 {
        FeeStatus::Partial
    } else {
        FeeStatus::Unpaid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: i64,
    pub student_id: i64,
    pub amount_paid: f64,
    pub payment_date: String,
    pub payment_method: String,
    pub term: String,
    pub session: String,
    pub note: Option<String>,
    pub reference_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardTotals {
    pub total_students: i64,
    pub total_fees: i64,
    pub total_paid: f64,
}

impl DashboardTotals {
    pub fn balance(&self) -> f64 {
        self.total_fees as f64 - self.total_paid
    }
}

pub fn list_classes(conn: &Connection) -> anyhow::Result<Vec<Class>> {
    let mut stmt = conn.prepare("SELECT id, name, total_fees FROM classes ORDER BY id ASC")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Class {
                id: row.get(0)?,
                name: row.get(1)?,
                total_fees: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn dashboard_totals(conn: &Connection) -> anyhow::Result<DashboardTotals> {
    let total_students: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    // Expected fees count each student once at their class's current fee.
    let total_fees: i64 = conn.query_row(
        "SELECT COALESCE(SUM(c.total_fees), 0)
         FROM students s
         JOIN classes c ON s.class_id = c.id",
        [],
        |r| r.get(0),
    )?;
    let total_paid: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_paid), 0.0) FROM students",
        [],
        |r| r.get(0),
    )?;
    Ok(DashboardTotals {
        total_students,
        total_fees,
        total_paid,
    })
}

const STUDENT_ROW_SELECT: &str = "SELECT s.id, s.name, s.class_id, c.name, c.total_fees, s.amount_paid
     FROM students s
     JOIN classes c ON s.class_id = c.id";

fn student_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        class_id: row.get(2)?,
        class_name: row.get(3)?,
        total_fees: row.get(4)?,
        amount_paid: row.get(5)?,
    })
}

pub fn students_in_class(conn: &Connection, class_id: i64) -> anyhow::Result<Vec<StudentRow>> {
    let sql = format!("{STUDENT_ROW_SELECT} WHERE s.class_id = ? ORDER BY s.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([class_id], student_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Students of a class narrowed by a name search.
///
/// Matching ignores case (Unicode lowercasing, so `émile` finds `Émile`).
/// A search with no match inside the class falls back to the whole class
/// rather than an empty page.
pub fn class_listing(
    conn: &Connection,
    class_id: i64,
    search: &str,
) -> anyhow::Result<Vec<StudentRow>> {
    let all = students_in_class(conn, class_id)?;
    let needle = search.trim().to_lowercase();
    let matches: Vec<StudentRow> = all
        .iter()
        .filter(|row| row.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    if matches.is_empty() {
        Ok(all)
    } else {
        Ok(matches)
    }
}

pub fn create_student(conn: &Connection, name: &str, class_id: i64) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO students(name, class_id) VALUES(?, ?)",
        (name, class_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_student(conn: &Connection, student_id: i64) -> anyhow::Result<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, class_id, amount_paid FROM students WHERE id = ?",
            [student_id],
            |row| {
                Ok(Student {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    class_id: row.get(2)?,
                    amount_paid: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(student)
}

/// Overwrites name and class. Returns the number of rows touched.
pub fn update_student(
    conn: &Connection,
    student_id: i64,
    name: &str,
    class_id: i64,
) -> anyhow::Result<usize> {
    let changed = conn.execute(
        "UPDATE students SET name = ?, class_id = ? WHERE id = ?",
        (name, class_id, student_id),
    )?;
    Ok(changed)
}

/// Removes the student's payments and then the student, in one transaction.
/// Returns false when no such student existed.
pub fn delete_student(conn: &mut Connection, student_id: i64) -> anyhow::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM payments WHERE student_id = ?", [student_id])?;
    let removed = tx.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Strict fee parse: surrounding whitespace is ignored, anything else that
/// isn't a non-negative integer is rejected.
pub fn parse_fee(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|v| *v >= 0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeBatchSummary {
    pub applied: usize,
    pub skipped: Vec<String>,
}

/// Applies each `(class id, fee)` entry on its own. Malformed ids or fees are
/// skipped; one bad entry never blocks the rest.
pub fn apply_fee_updates(
    conn: &Connection,
    entries: &[(String, String)],
) -> anyhow::Result<FeeBatchSummary> {
    let mut summary = FeeBatchSummary::default();
    for (raw_id, raw_fee) in entries {
        let (Ok(class_id), Some(fee)) = (raw_id.trim().parse::<i64>(), parse_fee(raw_fee)) else {
            summary.skipped.push(raw_id.clone());
            continue;
        };
        let changed = conn.execute(
            "UPDATE classes SET total_fees = ? WHERE id = ?",
            (fee, class_id),
        )?;
        if changed > 0 {
            summary.applied += 1;
        } else {
            summary.skipped.push(raw_id.clone());
        }
    }
    Ok(summary)
}

/// A payment that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    /// Class to record on the student; `None` keeps the current one.
    pub class_id: Option<i64>,
    pub amount: f64,
    pub payment_method: String,
    pub term: String,
    pub session: String,
    pub note: Option<String>,
    pub reference_code: String,
}

/// Raw payment form fields, before validation.
#[derive(Debug, Clone, Default)]
pub struct PaymentInput<'a> {
    pub class_id: &'a str,
    pub amount: &'a str,
    pub payment_method: &'a str,
    pub term: &'a str,
    pub session: &'a str,
    pub note: &'a str,
    pub reference_code: &'a str,
}

pub fn validate_payment(input: &PaymentInput<'_>) -> Option<NewPayment> {
    let present = |v: &str| !v.trim().is_empty();
    if !present(input.payment_method)
        || !present(input.term)
        || !present(input.session)
        || !present(input.reference_code)
    {
        return None;
    }
    let amount = input.amount.trim().parse::<f64>().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let class_id = match input.class_id.trim() {
        "" => None,
        raw => Some(raw.parse::<i64>().ok()?),
    };
    let note = Some(input.note.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Some(NewPayment {
        class_id,
        amount,
        payment_method: input.payment_method.trim().to_string(),
        term: input.term.trim().to_string(),
        session: input.session.trim().to_string(),
        note,
        reference_code: input.reference_code.trim().to_string(),
    })
}

/// Inserts the payment, recomputes the student's running total from all of
/// its payments, and writes the total (and class) back. All three statements
/// commit together. Returns the new total.
pub fn record_payment(
    conn: &mut Connection,
    student_id: i64,
    payment: &NewPayment,
    paid_at: DateTime<Utc>,
) -> anyhow::Result<f64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO payments(
           student_id,
           amount_paid,
           payment_date,
           payment_method,
           term,
           session,
           note,
           reference_code
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            student_id,
            payment.amount,
            paid_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            &payment.payment_method,
            &payment.term,
            &payment.session,
            payment.note.as_deref(),
            &payment.reference_code,
        ),
    )?;
    let total: f64 = tx.query_row(
        "SELECT COALESCE(SUM(amount_paid), 0.0) FROM payments WHERE student_id = ?",
        [student_id],
        |r| r.get(0),
    )?;
    tx.execute(
        "UPDATE students SET class_id = COALESCE(?, class_id), amount_paid = ? WHERE id = ?",
        (payment.class_id, total, student_id),
    )?;
    tx.commit()?;
    Ok(total)
}

pub fn payment_history(conn: &Connection, student_id: i64) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, amount_paid, payment_date, payment_method, term, session, note, reference_code
         FROM payments
         WHERE student_id = ?
         ORDER BY payment_date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([student_id], |row| {
            Ok(Payment {
                id: row.get(0)?,
                student_id: row.get(1)?,
                amount_paid: row.get(2)?,
                payment_date: row.get(3)?,
                payment_method: row.get(4)?,
                term: row.get(5)?,
                session: row.get(6)?,
                note: row.get(7)?,
                reference_code: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn payment_totals_by_student(conn: &Connection) -> anyhow::Result<HashMap<i64, f64>> {
    let mut stmt = conn.prepare(
        "SELECT student_id, SUM(amount_paid) FROM payments GROUP BY student_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

/// Students for the fee report, optionally limited to one class.
pub fn report_students(conn: &Connection, class_id: Option<i64>) -> anyhow::Result<Vec<Student>> {
    let map = |row: &rusqlite::Row<'_>| {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            class_id: row.get(2)?,
            amount_paid: row.get(3)?,
        })
    };
    let rows = match class_id {
        Some(cid) => {
            let mut stmt = conn.prepare(
                "SELECT id, name, class_id, amount_paid FROM students WHERE class_id = ? ORDER BY name, id",
            )?;
            let rows = stmt.query_map([cid], map)?.collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, name, class_id, amount_paid FROM students ORDER BY class_id, name, id",
            )?;
            let rows = stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

pub fn ping(conn: &Connection) -> anyhow::Result<()> {
    let _: i64 = conn.query_row("SELECT 1", [], |r| r.get(0))?;
    Ok(())
}

/// `1234567.5` -> `"1,234,567.50"`, `20000.0` -> `"20,000"`.
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative && cents > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac:02}")
    }
}

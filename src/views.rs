use askama::Template;
use serde::Deserialize;

use crate::ledger::{format_amount, Class, DashboardTotals, Payment, Student, StudentRow};

/// Sidebar sections; the active one gets highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    ManageStudents,
    AddStudent,
    Fees,
    Payments,
    Classes,
    Reports,
}

#[derive(Debug, Clone, Copy)]
pub struct Nav {
    active: Section,
}

impl Nav {
    pub fn new(active: Section) -> Self {
        Self { active }
    }

    pub fn class_for(&self, name: &str) -> &'static str {
        let section = match name {
            "dashboard" => Section::Dashboard,
            "manage" => Section::ManageStudents,
            "add" => Section::AddStudent,
            "fees" => Section::Fees,
            "payments" => Section::Payments,
            "classes" => Section::Classes,
            "reports" => Section::Reports,
            _ => return "",
        };
        if section == self.active {
            "active"
        } else {
            ""
        }
    }
}

/// `?success=` / `?error=` messages carried by redirects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassOption {
    pub id: i64,
    pub name: String,
    pub fee: String,
    pub selected: bool,
}

pub fn class_options(classes: &[Class], selected: Option<i64>) -> Vec<ClassOption> {
    classes
        .iter()
        .map(|c| ClassOption {
            id: c.id,
            name: c.name.clone(),
            fee: format_amount(c.total_fees as f64),
            selected: Some(c.id) == selected,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StudentLine {
    pub id: i64,
    pub name: String,
    pub class_name: String,
    pub total_fees: String,
    pub amount_paid: String,
    pub balance: String,
    pub status: &'static str,
}

impl From<&StudentRow> for StudentLine {
    fn from(row: &StudentRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            class_name: row.class_name.clone(),
            total_fees: format_amount(row.total_fees as f64),
            amount_paid: format_amount(row.amount_paid),
            balance: format_amount(row.balance()),
            status: row.status().label(),
        }
    }
}

pub fn student_lines(rows: &[StudentRow]) -> Vec<StudentLine> {
    rows.iter().map(StudentLine::from).collect()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct DashboardPage {
    pub nav: Nav,
    pub total_students: i64,
    pub total_fees: String,
    pub total_payments: String,
    pub total_balance: String,
}

impl DashboardPage {
    pub fn new(totals: &DashboardTotals) -> Self {
        Self {
            nav: Nav::new(Section::Dashboard),
            total_students: totals.total_students,
            total_fees: format_amount(totals.total_fees as f64),
            total_payments: format_amount(totals.total_paid),
            total_balance: format_amount(totals.balance()),
        }
    }
}

/// Data shared by the two class-filtered student listings.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub classes: Vec<ClassOption>,
    pub students: Vec<StudentLine>,
    pub search: String,
    pub class_selected: bool,
}

#[derive(Template)]
#[template(path = "view_student.html")]
pub struct ManageStudentsPage {
    pub nav: Nav,
    pub flash: Flash,
    pub listing: Listing,
}

#[derive(Template)]
#[template(path = "student_list.html")]
pub struct StudentListPage {
    pub nav: Nav,
    pub flash: Flash,
    pub listing: Listing,
}

#[derive(Template)]
#[template(path = "add_student.html")]
pub struct AddStudentPage {
    pub nav: Nav,
    pub flash: Flash,
    pub classes: Vec<ClassOption>,
}

#[derive(Template)]
#[template(path = "edit_student.html")]
pub struct EditStudentPage {
    pub nav: Nav,
    pub student_id: i64,
    pub name: String,
    pub classes: Vec<ClassOption>,
}

impl EditStudentPage {
    pub fn new(student: &Student, classes: &[Class]) -> Self {
        Self {
            nav: Nav::new(Section::ManageStudents),
            student_id: student.id,
            name: student.name.clone(),
            classes: class_options(classes, Some(student.class_id)),
        }
    }
}

#[derive(Template)]
#[template(path = "edit_fees.html")]
pub struct EditFeesPage {
    pub nav: Nav,
    pub classes: Vec<Class>,
}

#[derive(Template)]
#[template(path = "payment_form.html")]
pub struct PaymentFormPage {
    pub nav: Nav,
    pub flash: Flash,
    pub student_id: i64,
    pub student_name: String,
    pub amount_paid: String,
    pub classes: Vec<ClassOption>,
}

#[derive(Debug, Clone)]
pub struct PaymentLine {
    pub date: String,
    pub amount: String,
    pub method: String,
    pub term: String,
    pub session: String,
    pub note: String,
    pub reference_code: String,
}

impl From<&Payment> for PaymentLine {
    fn from(p: &Payment) -> Self {
        let date = chrono::DateTime::parse_from_rfc3339(&p.payment_date)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| p.payment_date.clone());
        Self {
            date,
            amount: format_amount(p.amount_paid),
            method: p.payment_method.clone(),
            term: p.term.clone(),
            session: p.session.clone(),
            note: p.note.clone().unwrap_or_default(),
            reference_code: p.reference_code.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "payment_history.html")]
pub struct PaymentHistoryPage {
    pub nav: Nav,
    pub student_id: i64,
    pub student_name: String,
    pub total_paid: String,
    pub payments: Vec<PaymentLine>,
}

impl PaymentHistoryPage {
    pub fn new(student: &Student, payments: &[Payment]) -> Self {
        Self {
            nav: Nav::new(Section::Payments),
            student_id: student.id,
            student_name: student.name.clone(),
            total_paid: format_amount(student.amount_paid),
            payments: payments.iter().map(PaymentLine::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "class_payment.html")]
pub struct ClassPaymentPage {
    pub nav: Nav,
    pub classes: Vec<ClassOption>,
    pub class_name: Option<String>,
    pub students: Vec<StudentLine>,
    pub total_expected: String,
    pub total_paid: String,
    pub total_balance: String,
}

impl ClassPaymentPage {
    pub fn new(classes: &[Class], class_id: Option<i64>, rows: &[StudentRow]) -> Self {
        let class_name = class_id.and_then(|id| {
            classes
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.name.clone())
        });
        let expected: i64 = rows.iter().map(|r| r.total_fees).sum();
        let paid: f64 = rows.iter().map(|r| r.amount_paid).sum();
        Self {
            nav: Nav::new(Section::Classes),
            classes: class_options(classes, class_id),
            class_name,
            students: student_lines(rows),
            total_expected: format_amount(expected as f64),
            total_paid: format_amount(paid),
            total_balance: format_amount(expected as f64 - paid),
        }
    }
}

#[derive(Template)]
#[template(path = "report_picker.html")]
pub struct ReportPickerPage {
    pub nav: Nav,
    pub classes: Vec<ClassOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, fees: i64, paid: f64) -> StudentRow {
        StudentRow {
            id,
            name: format!("Student {id}"),
            class_id: 1,
            class_name: "JSS1".into(),
            total_fees: fees,
            amount_paid: paid,
        }
    }

    #[test]
    fn nav_marks_only_the_active_section() {
        let nav = Nav::new(Section::Fees);
        assert_eq!(nav.class_for("fees"), "active");
        assert_eq!(nav.class_for("dashboard"), "");
        assert_eq!(nav.class_for("nope"), "");
    }

    #[test]
    fn class_payment_page_totals_its_rows() {
        let classes = vec![Class {
            id: 1,
            name: "JSS1".into(),
            total_fees: 50_000,
        }];
        let page = ClassPaymentPage::new(&classes, Some(1), &[row(1, 50_000, 20_000.0), row(2, 50_000, 0.0)]);
        assert_eq!(page.class_name.as_deref(), Some("JSS1"));
        assert_eq!(page.total_expected, "100,000");
        assert_eq!(page.total_balance, "80,000");
        assert_eq!(page.students[0].status, "Partial");
        assert_eq!(page.students[1].status, "Unpaid");
        assert!(page.classes[0].selected);
    }

    #[test]
    fn dashboard_page_renders_totals() {
        let page = DashboardPage::new(&DashboardTotals {
            total_students: 2,
            total_fees: 100_000,
            total_paid: 20_000.0,
        });
        let html = page.render().expect("render dashboard");
        assert!(html.contains("80,000"));
        assert!(html.contains("20,000"));
    }
}

use crate::http::error::{AppError, AppResult};

pub mod classes;
pub mod dashboard;
pub mod fees;
pub mod payments;
pub mod reports;
pub mod students;

pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub(crate) fn parse_student_id(raw: &str) -> AppResult<i64> {
    parse_id(raw).ok_or(AppError::BadRequest("invalid student id"))
}

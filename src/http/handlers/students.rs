use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use tracing::{debug, error, info};

use super::{parse_id, parse_student_id};
use crate::http::error::{redirect_with, render, AppError, AppResult};
use crate::http::types::{AppState, ListingQuery, StudentForm};
use crate::ledger;
use crate::pool::Pool;
use crate::views::{
    class_options, student_lines, AddStudentPage, EditStudentPage, Flash, Listing,
    ManageStudentsPage, Nav, Section,
};

/// Classes for the picker plus, once a class is chosen, its students
/// narrowed by the search term.
pub(super) async fn load_listing(pool: &Pool, query: ListingQuery) -> AppResult<Listing> {
    let class_id = parse_id(&query.class_id);
    let search = query.search.trim().to_string();
    let term = search.clone();
    let (classes, rows) = pool
        .run(move |conn| {
            let classes = ledger::list_classes(conn)?;
            let rows = match class_id {
                Some(id) => ledger::class_listing(conn, id, &term)?,
                None => Vec::new(),
            };
            Ok((classes, rows))
        })
        .await?;
    Ok(Listing {
        classes: class_options(&classes, class_id),
        students: student_lines(&rows),
        search,
        class_selected: class_id.is_some(),
    })
}

pub async fn manage_picker(
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> AppResult<Html<String>> {
    let listing = load_listing(&state.pool, ListingQuery::default()).await?;
    render(&ManageStudentsPage {
        nav: Nav::new(Section::ManageStudents),
        flash,
        listing,
    })
}

pub async fn manage_listing(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Html<String>> {
    let listing = load_listing(&state.pool, query).await?;
    render(&ManageStudentsPage {
        nav: Nav::new(Section::ManageStudents),
        flash: Flash::default(),
        listing,
    })
}

pub async fn add_form(
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> AppResult<Html<String>> {
    let classes = state.pool.run(|conn| ledger::list_classes(conn)).await?;
    render(&AddStudentPage {
        nav: Nav::new(Section::AddStudent),
        flash,
        classes: class_options(&classes, None),
    })
}

pub async fn add_student(State(state): State<AppState>, Form(form): Form<StudentForm>) -> Redirect {
    let name = form.name.trim().to_string();
    let class_id = parse_id(&form.class_id);
    let Some(class_id) = class_id.filter(|_| !name.is_empty()) else {
        info!("add student rejected: missing fields");
        return redirect_with("/add-student", "error", "All fields are required.");
    };
    match state
        .pool
        .run(move |conn| ledger::create_student(conn, &name, class_id))
        .await
    {
        Ok(student_id) => {
            info!(student_id, class_id, "student added");
            redirect_with("/add-student", "success", "Student added successfully.")
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), class_id, "add student failed");
            redirect_with("/add-student", "error", "Failed to add student.")
        }
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
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
    render(&EditStudentPage::new(&student, &classes))
}

/// Name and class are written as given; only the class id must be numeric.
pub async fn update_student(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<StudentForm>,
) -> AppResult<Redirect> {
    let student_id = parse_student_id(&raw_id)?;
    let class_id = parse_id(&form.class_id).ok_or(AppError::BadRequest("invalid class id"))?;
    let name = form.name;
    let changed = state
        .pool
        .run(move |conn| ledger::update_student(conn, student_id, &name, class_id))
        .await?;
    debug!(student_id, changed, "student updated");
    Ok(Redirect::to("/"))
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Redirect> {
    let student_id = parse_student_id(&raw_id)?;
    let removed = state
        .pool
        .run(move |conn| ledger::delete_student(conn, student_id))
        .await?;
    info!(student_id, removed, "student deleted");
    Ok(Redirect::to("/view-student"))
}

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{classes, dashboard, fees, payments, reports, students};
use super::request_tracing::request_tracing_middleware;
use super::types::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/healthz", get(dashboard::healthz))
        .route("/static/app.css", get(dashboard::stylesheet))
        .route("/view-student", get(students::manage_picker))
        .route("/view-student/classId", get(students::manage_listing))
        .route(
            "/add-student",
            get(students::add_form).post(students::add_student),
        )
        .route("/edit-student/{id}", get(students::edit_form))
        .route("/update-student/{id}", post(students::update_student))
        .route("/delete-student/{id}", post(students::delete_student))
        .route("/edit-fees", get(fees::edit_form))
        .route("/update-fees", post(fees::update_fees))
        .route("/students", get(payments::picker))
        .route("/students/classId", get(payments::listing))
        .route(
            "/students/{id}/pay",
            get(payments::pay_form).post(payments::pay),
        )
        .route("/students/{id}/payment-history", get(payments::history))
        .route("/classes", get(classes::index))
        .route("/classes/{id}", get(classes::show))
        .route("/pdf", get(reports::picker))
        .route("/students/pdf", get(reports::export))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

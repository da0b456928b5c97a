use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Failures a handler can end with. Details are logged, never sent.
#[derive(Debug)]
pub enum AppError {
    Store(anyhow::Error),
    Render(askama::Error),
    Pdf(anyhow::Error),
    NotFound,
    BadRequest(&'static str),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Render(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Store(e) => {
                error!(error = %format!("{e:#}"), "store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
            }
            AppError::Render(e) => {
                error!(error = %e, "template render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
            }
            AppError::Pdf(e) => {
                error!(error = %format!("{e:#}"), "report export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error generating PDF").into_response()
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            AppError::BadRequest(msg) => {
                warn!(reason = msg, "rejected request");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
        }
    }
}

/// 303 back to `path` with a url-encoded `?key=message`.
pub fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?{key}={}", urlencoding::encode(message)))
}

pub fn render<T: Template>(page: &T) -> AppResult<Html<String>> {
    Ok(Html(page.render()?))
}

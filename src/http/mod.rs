mod error;
mod handlers;
mod request_tracing;
mod router;
mod types;

pub use router::build_router;
pub use types::AppState;

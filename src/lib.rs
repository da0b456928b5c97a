//! School fee ledger: a server-rendered web app over an embedded SQLite store.

pub mod config;
pub mod db;
mod http;
pub mod ledger;
pub mod logging;
pub mod pool;
pub mod report;
mod views;

pub use http::{build_router, AppState};

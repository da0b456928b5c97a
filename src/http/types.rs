use serde::Deserialize;
use std::sync::Arc;

use crate::pool::Pool;
use crate::report::{PdfOptions, PdfRenderer};

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub renderer: Arc<dyn PdfRenderer>,
    pub pdf: PdfOptions,
}

impl AppState {
    pub fn new(pool: Pool, renderer: Arc<dyn PdfRenderer>) -> Self {
        Self {
            pool,
            renderer,
            pdf: PdfOptions::default(),
        }
    }
}

/// `?classId=&search=` on the two student listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "classId", default)]
    pub class_id: String,
    #[serde(default)]
    pub search: String,
}

/// Optional `?classId=` on the class view and the report export.
#[derive(Debug, Default, Deserialize)]
pub struct ClassIdQuery {
    #[serde(rename = "classId", default)]
    pub class_id: Option<String>,
}

impl ClassIdQuery {
    pub fn raw(&self) -> Option<&str> {
        self.class_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "classId", default)]
    pub class_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(rename = "classId", default)]
    pub class_id: String,
    #[serde(default)]
    pub amount_paid: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub reference_code: String,
}

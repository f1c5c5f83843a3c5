//! Form descriptor endpoint.

use axum::Json;

use crate::forms::{FORMS, FormDescriptor};

/// List the form types the extraction pipeline understands
pub async fn list_forms_handler() -> Json<Vec<FormDescriptor>> {
    Json(FORMS.iter().copied().collect())
}

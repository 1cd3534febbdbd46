use axum::Json;

use crate::services::llm_provider::{self, ProviderInfo};

/// Provider/model catalog for the upload page's model picker.
pub async fn list_models() -> Json<Vec<ProviderInfo>> {
    Json(llm_provider::supported_providers())
}

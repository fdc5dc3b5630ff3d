use axum::{extract::State, response::Json};
use std::{collections::BTreeMap, sync::Arc};

use crate::core::voices::Voice;
use crate::state::AppState;

pub type VoicesResponse = BTreeMap<String, Vec<Voice>>;

/// Handler for GET /voices - returns the catalog grouped by language
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/voices",
        responses(
            (status = 200, description = "Available voices grouped by language", body = BTreeMap<String, Vec<Voice>>)
        ),
        tag = "voices"
    )
)]
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    Json(state.core_state.catalog.voices())
}

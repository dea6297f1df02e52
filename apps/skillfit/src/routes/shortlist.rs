use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::matching::exporter::{
    load_non_retained, load_retained, NonRetainedEntry, RetainedEntry, NON_RETAINED_JSON,
    RETAINED_JSON,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ShortlistResponse {
    pub retained: Vec<RetainedEntry>,
    pub non_retained: Vec<NonRetainedEntry>,
}

/// GET /api/v1/shortlist
/// Latest matching run outputs from `<data>/outputs`.
pub async fn handle_get_shortlist(
    State(state): State<AppState>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let out_dir = state.config.outputs_dir();
    let retained_path = out_dir.join(RETAINED_JSON);
    if !retained_path.is_file() {
        return Err(AppError::NotFound(
            "No shortlist yet: run a matching first".to_string(),
        ));
    }
    let retained = load_retained(&retained_path)?;

    let non_retained_path = out_dir.join(NON_RETAINED_JSON);
    let non_retained = if non_retained_path.is_file() {
        load_non_retained(&non_retained_path)?
    } else {
        Vec::new()
    };

    Ok(Json(ShortlistResponse {
        retained,
        non_retained,
    }))
}

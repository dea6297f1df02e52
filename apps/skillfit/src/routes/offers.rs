use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::offer::{ExtractedOffer, NewOffer, Offer};
use crate::offers::extractor::{extract_offer, save_offer, OfferExtractionError};
use crate::offers::default_out_dir;
use crate::state::AppState;

fn validate(offer: &NewOffer) -> Result<(), AppError> {
    if offer.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if offer.experience_years.is_some_and(|years| years < 0) {
        return Err(AppError::Validation(
            "experience_years must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Offer {id} not found"))
}

/// GET /api/v1/offers
pub async fn handle_list_offers(State(state): State<AppState>) -> Result<Json<Vec<Offer>>, AppError> {
    Ok(Json(state.offers.list().await?))
}

/// POST /api/v1/offers
pub async fn handle_create_offer(
    State(state): State<AppState>,
    Json(req): Json<NewOffer>,
) -> Result<(StatusCode, Json<Offer>), AppError> {
    validate(&req)?;
    let offer = state.offers.insert(&req).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// GET /api/v1/offers/:id
pub async fn handle_get_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Offer>, AppError> {
    let offer = state.offers.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(offer))
}

/// PUT /api/v1/offers/:id
pub async fn handle_update_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewOffer>,
) -> Result<Json<Offer>, AppError> {
    validate(&req)?;
    let offer = state
        .offers
        .update(id, &req)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(offer))
}

/// DELETE /api/v1/offers/:id
pub async fn handle_delete_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.offers.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub extracted: ExtractedOffer,
    /// Set when the extraction produced usable fields.
    pub stored: Option<Offer>,
    pub json_path: PathBuf,
}

/// POST /api/v1/offers/upload
/// Multipart with one PDF file field. The PDF is kept under `<data>/offers/uploads`.
pub async fn handle_upload_offer(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("cannot read uploaded file: {e}")))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("no file in upload".to_string()))?;
    let name = std::path::Path::new(&file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.to_lowercase().ends_with(".pdf"))
        .ok_or_else(|| AppError::Validation(format!("{file_name} is not a PDF file")))?
        .to_string();

    let uploads = state.config.offers_dir().join("uploads");
    std::fs::create_dir_all(&uploads)?;
    let pdf_path = uploads.join(&name);
    std::fs::write(&pdf_path, &bytes)?;
    info!(path = %pdf_path.display(), bytes = bytes.len(), "offer PDF uploaded");

    let extracted = extract_offer(state.llm.as_ref(), &pdf_path)
        .await
        .map_err(|e| match e {
            OfferExtractionError::Document(e) => {
                AppError::Validation(format!("cannot read {name}: {e}"))
            }
            OfferExtractionError::Llm(e) => AppError::Llm(e),
        })?;
    let json_path = save_offer(&extracted, &default_out_dir(&state.config.data_dir))?;

    let stored = match NewOffer::from_extracted(&extracted) {
        Some(new_offer) => Some(state.offers.insert(&new_offer).await?),
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            extracted,
            stored,
            json_path,
        }),
    ))
}

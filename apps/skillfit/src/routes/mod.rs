pub mod health;
pub mod offers;
pub mod shortlist;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Offers API
        .route(
            "/api/v1/offers",
            get(offers::handle_list_offers).post(offers::handle_create_offer),
        )
        .route("/api/v1/offers/upload", post(offers::handle_upload_offer))
        .route(
            "/api/v1/offers/:id",
            get(offers::handle_get_offer)
                .put(offers::handle_update_offer)
                .delete(offers::handle_delete_offer),
        )
        // Matching outputs
        .route("/api/v1/shortlist", get(shortlist::handle_get_shortlist))
        .with_state(state)
}

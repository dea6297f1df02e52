use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatCompletion;
use crate::offers::repository::OfferRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub offers: OfferRepository,
    /// Extraction-model client used for uploaded offers.
    pub llm: Arc<dyn ChatCompletion>,
    pub config: Config,
}

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::handlers::{get_fund, health, list_bonds, list_funds, list_issuers};
use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/funds", get(list_funds))
        .route("/api/funds/:cnpj", get(get_fund))
        .route("/api/bonds", get(list_bonds))
        .route("/api/issuers", get(list_issuers))
        // The dashboard is a static page served elsewhere
        .layer(CorsLayer::permissive())
        .with_state(state)
}

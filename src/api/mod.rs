pub mod conversions;
pub mod health;
pub mod inventory;
pub mod ledger;
pub mod samples;
pub mod signature;
pub mod webhooks;
pub mod wholesale;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::{InventoryStager, WholesaleService};
use crate::orchestration::EventPipeline;
use crate::platform::CommercePlatform;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub pipeline: Arc<EventPipeline>,
    pub wholesale: Arc<WholesaleService>,
    pub stager: Arc<InventoryStager>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        platform: Arc<dyn CommercePlatform>,
    ) -> Self {
        Self {
            pipeline: Arc::new(EventPipeline::new(repo.clone(), platform)),
            wholesale: Arc::new(WholesaleService::new(repo.clone())),
            stager: Arc::new(InventoryStager::new(repo.clone())),
            repo,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/webhooks/orders", post(webhooks::handle_order_event))
        .route("/v1/samples", post(samples::record_sample))
        .route("/v1/partnerships/:id/ledger", get(ledger::get_ledger))
        .route("/v1/conversions", get(conversions::list_conversions))
        .route("/v1/inventory", get(inventory::list_inventory))
        .route("/v1/inventory/sales", post(inventory::record_sale))
        .route("/v1/wholesale", post(wholesale::create_order))
        .route("/v1/wholesale/:id", get(wholesale::get_order))
        .route("/v1/wholesale/:id/submit", post(wholesale::submit_order))
        .route("/v1/wholesale/:id/verify", post(wholesale::verify_order))
        .layer(cors)
        .with_state(state)
}

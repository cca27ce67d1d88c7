//! Payment gateway integration service.
//!
//! Bridges a storefront's orders to a Brazilian payment processor: Pix,
//! bank slip (boleto) and credit card checkout, plus the webhook that
//! settles orders when the processor confirms payment.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod document;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod processor;
pub mod request_id;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use serde::Serialize;
use tower_http::services::ServeDir;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::processor::ProcessorApi;
use crate::services::checkout::CheckoutService;
use crate::services::persisters::{ArtifactStore, PaymentDataPersister};
use crate::services::receipts::ReceiptService;
use crate::store::OrderStore;

/// Shared application state. Both ports are trait objects so tests wire in
/// the in-memory store and a scripted processor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub processor: Arc<dyn ProcessorApi>,
    pub config: Arc<AppConfig>,
    pub events: EventSender,
    pub checkout: Arc<CheckoutService>,
    pub receipts: Arc<ReceiptService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        processor: Arc<dyn ProcessorApi>,
        config: Arc<AppConfig>,
        events: EventSender,
    ) -> Self {
        let artifacts = ArtifactStore::new(
            config.artifact_dir.clone(),
            config.artifact_base_url.clone(),
            Duration::from_secs(config.artifact_timeout_secs),
        );
        let persister = PaymentDataPersister::new(store.clone(), artifacts);
        let checkout = Arc::new(CheckoutService::new(
            store.clone(),
            processor.clone(),
            persister,
            events.clone(),
            config.store_name.clone(),
            config.max_installments(),
        ));
        let receipts = Arc::new(ReceiptService::new(store.clone()));
        Self {
            store,
            processor,
            config,
            events,
            checkout,
            receipts,
        }
    }
}

/// Standard success envelope for API responses.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: request_id::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Versioned API surface: checkout submissions, receipts and the processor
/// webhook.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::checkout::routes())
        .merge(handlers::receipts::routes())
        .merge(handlers::webhooks::routes())
}

/// Full application router, ready for `with_state`.
pub fn app_router(artifact_dir: &str) -> Router<AppState> {
    Router::new()
        .merge(handlers::health::routes())
        .merge(openapi::routes())
        .nest("/api/v1", api_v1_routes())
        .nest_service("/artifacts", ServeDir::new(artifact_dir))
}

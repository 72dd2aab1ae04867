use std::sync::Arc;

use axum::{http::StatusCode, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::signature::HmacValidator;
use super::audit::{handle_audit, AuditState};

pub const AUDIT_PATH: &str = "/audit";

async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub fn create_router(config: &ServerConfig) -> Result<Router> {
    let validator = config
        .secret
        .as_ref()
        .map(|secret| secret.resolve().map(|key| HmacValidator::new(key, config.header_name.clone())))
        .transpose()?;

    if validator.is_none() {
        tracing::warn!("No audit secret configured, accepting unsigned alerts");
    }

    let state = Arc::new(AuditState { validator });

    let router = Router::new()
        .route("/-/healthz", get(health_check))
        .route("/-/ready", get(health_check))
        .route(AUDIT_PATH, post(handle_audit).with_state(state))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

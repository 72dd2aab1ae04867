use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::error::{AppError, Result};
use crate::pipeline::event::{Alert, EventKind};
use crate::signature::HmacValidator;

pub struct AuditState {
    pub validator: Option<HmacValidator>,
}

pub async fn handle_audit(
    State(state): State<Arc<AuditState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    if let Some(validator) = &state.validator {
        let signature = headers
            .get(validator.header_name())
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::MissingSignature)?;

        validator.validate(&body, signature)?;
    }

    let alert: Alert = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Failed to decode alert: {}", e);
        AppError::JsonParse(e)
    })?;

    tracing::info!(
        agent = %alert.agent_id,
        event_type = %alert.event_type,
        details = %alert.details,
        source = alert.source.as_deref().unwrap_or("-"),
        "Security alert received"
    );

    if alert.event_type == EventKind::UnauthorizedAccess {
        tracing::warn!(agent = %alert.agent_id, "Crypto-miner signature detected!");
    }

    Ok(StatusCode::OK)
}

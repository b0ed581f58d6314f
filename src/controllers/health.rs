use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::{oauth::ConnectionStatus, salesforce::SalesforceConnector};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready as soon as the process serves requests; Salesforce may still need
/// connecting through the UI.
pub async fn health_ready(State(connector): State<Arc<SalesforceConnector>>) -> impl IntoResponse {
    let status = connector.status().await;
    let salesforce = match status.oauth {
        Some(ConnectionStatus::Authenticated) => "connected",
        _ if status.password_fallback => "password_login",
        _ => "not_connected",
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "salesforce": salesforce,
            "oauth_configured": status.oauth_configured,
        })),
    )
}

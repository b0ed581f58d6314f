use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    domain::{
        access::{AccessError, AccessGate, SessionContext},
        salesforce::{SalesforceConnector, SalesforceStatus},
    },
    infrastructure::auth::CurrentSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Granted,
    SignInRequired,
    Denied,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionContext,
    pub access: AccessState,
    pub salesforce: SalesforceStatus,
}

pub struct SessionController {
    gate: Arc<AccessGate>,
    connector: Arc<SalesforceConnector>,
}

impl SessionController {
    pub fn new(gate: Arc<AccessGate>, connector: Arc<SalesforceConnector>) -> Self {
        Self { gate, connector }
    }

    /// GET /api/session - Sign-in and Salesforce connection status
    pub async fn status(
        State(controller): State<Arc<SessionController>>,
        Extension(session): Extension<CurrentSession>,
    ) -> Json<SessionResponse> {
        let context = controller.gate.context(&session.0).await;
        let access = match controller.gate.admit(&context) {
            Ok(_) => AccessState::Granted,
            Err(AccessError::SignInRequired) => AccessState::SignInRequired,
            Err(AccessError::Denied(_)) => AccessState::Denied,
        };

        Json(SessionResponse {
            session: context,
            access,
            salesforce: controller.connector.status().await,
        })
    }
}

use axum::{
    extract::{Query, State},
    response::Redirect,
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        access::{AccessGate, AccessGrant},
        dashboard::DashboardServiceApi,
        oauth::{OAuthError, OAuthSession},
        salesforce::SalesforceConnector,
    },
    error::{AppError, AppResult},
    infrastructure::auth::CurrentSession,
};

/// Provider redirect back to us. Either `code` and `state`, or `error`.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub struct OAuthController {
    connector: Arc<SalesforceConnector>,
    dashboard_service: Arc<dyn DashboardServiceApi>,
    gate: Arc<AccessGate>,
}

impl OAuthController {
    pub fn new(
        connector: Arc<SalesforceConnector>,
        dashboard_service: Arc<dyn DashboardServiceApi>,
        gate: Arc<AccessGate>,
    ) -> Self {
        Self {
            connector,
            dashboard_service,
            gate,
        }
    }

    /// The shared Salesforce connection is only managed by admitted users.
    async fn admit(&self, session: &CurrentSession) -> AppResult<AccessGrant> {
        let context = self.gate.context(&session.0).await;
        Ok(self.gate.admit(&context)?)
    }

    fn salesforce(&self) -> AppResult<&Arc<OAuthSession>> {
        self.connector
            .oauth()
            .ok_or_else(|| AppError::NotFound("Salesforce OAuth is not configured".to_string()))
    }

    /// GET /auth/salesforce/connect - Redirect to the Salesforce login page
    pub async fn salesforce_connect(
        State(controller): State<Arc<OAuthController>>,
        Extension(session): Extension<CurrentSession>,
    ) -> AppResult<Redirect> {
        controller.admit(&session).await?;
        let salesforce = controller.salesforce()?;

        let state = Uuid::new_v4().to_string();
        session.0.begin_salesforce_login(&state).await;
        let auth_url = salesforce.build_authorization_url(&state).await;
        Ok(Redirect::temporary(&auth_url))
    }

    /// GET /auth/salesforce/callback - Exchange the code and store the tokens
    ///
    /// Only the browser that started the login may complete it.
    pub async fn salesforce_callback(
        State(controller): State<Arc<OAuthController>>,
        Extension(session): Extension<CurrentSession>,
        Query(params): Query<OAuthCallbackParams>,
    ) -> AppResult<Redirect> {
        let grant = controller.admit(&session).await?;
        let salesforce = controller.salesforce()?;
        let (code, state) = callback_code(params)?;

        if !session.0.claim_salesforce_state(&state).await {
            tracing::warn!(session_id = %session.0.id(), "Salesforce callback state was not issued to this browser");
            return Err(OAuthError::StateMismatch.into());
        }

        salesforce.exchange_code(&code, &state).await?;
        controller.dashboard_service.invalidate_cache().await;
        tracing::info!(
            session_id = %session.0.id(),
            email = grant.identity().map(|i| i.email.as_str()).unwrap_or("-"),
            "Salesforce connected"
        );

        Ok(Redirect::to("/"))
    }

    /// POST /auth/salesforce/disconnect - Forget the Salesforce tokens
    ///
    /// Succeeds whether or not a connection exists.
    pub async fn salesforce_disconnect(
        State(controller): State<Arc<OAuthController>>,
        Extension(session): Extension<CurrentSession>,
    ) -> AppResult<Redirect> {
        let grant = controller.admit(&session).await?;
        if let Some(salesforce) = controller.connector.oauth() {
            salesforce.disconnect().await?;
        }
        controller.dashboard_service.invalidate_cache().await;
        tracing::info!(
            session_id = %session.0.id(),
            email = grant.identity().map(|i| i.email.as_str()).unwrap_or("-"),
            "Salesforce disconnected"
        );
        Ok(Redirect::to("/"))
    }

    /// GET /auth/azure/login - Redirect to the Microsoft sign-in page
    pub async fn azure_login(
        Extension(session): Extension<CurrentSession>,
    ) -> AppResult<Redirect> {
        let azure = azure_session(&session)?;
        let state = Uuid::new_v4().to_string();
        let auth_url = azure.build_authorization_url(&state).await;
        Ok(Redirect::temporary(&auth_url))
    }

    /// GET /auth/azure/callback - Complete the Microsoft sign-in for this browser
    pub async fn azure_callback(
        Extension(session): Extension<CurrentSession>,
        Query(params): Query<OAuthCallbackParams>,
    ) -> AppResult<Redirect> {
        let azure = azure_session(&session)?;
        let (code, state) = callback_code(params)?;

        let identity = azure.exchange_code(&code, &state).await?;
        tracing::info!(
            session_id = %session.0.id(),
            email = identity.as_ref().map(|i| i.email.as_str()).unwrap_or("-"),
            "Azure AD sign-in completed"
        );

        Ok(Redirect::to("/"))
    }

    /// POST /auth/azure/logout - Sign this browser out
    pub async fn azure_logout(
        Extension(session): Extension<CurrentSession>,
    ) -> AppResult<Redirect> {
        if let Some(azure) = session.0.azure() {
            azure.disconnect().await?;
        }
        Ok(Redirect::to("/"))
    }
}

fn azure_session(session: &CurrentSession) -> AppResult<&OAuthSession> {
    session
        .0
        .azure()
        .ok_or_else(|| AppError::NotFound("Azure AD sign-in is not configured".to_string()))
}

fn callback_code(params: OAuthCallbackParams) -> AppResult<(String, String)> {
    if let Some(error) = params.error {
        let reason = params.error_description.unwrap_or(error);
        return Err(OAuthError::Denied(reason).into());
    }

    match (params.code, params.state) {
        (Some(code), Some(state)) if !code.is_empty() => Ok((code, state)),
        _ => Err(AppError::BadRequest(
            "OAuth callback is missing code or state".to_string(),
        )),
    }
}

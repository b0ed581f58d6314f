use super::policy::AccessPolicy;
use crate::domain::oauth::Identity;
use crate::error::AppError;
use crate::infrastructure::session::UserSession;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("sign-in required")]
    SignInRequired,
    #[error("{0} is not allowed to view this dashboard")]
    Denied(String),
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::SignInRequired => AppError::SignInRequired,
            AccessError::Denied(email) => AppError::AccessDenied(email),
        }
    }
}

/// Authentication state of one browser session, resolved once per request
/// and handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub session_id: String,
    pub azure_enabled: bool,
    pub identity: Option<Identity>,
}

/// Proof that the access check passed. Only [`AccessGate::admit`] creates one,
/// and loading dashboard data requires it.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    identity: Option<Identity>,
}

impl AccessGrant {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

pub struct AccessGate {
    policy: AccessPolicy,
    azure_enabled: bool,
}

impl AccessGate {
    pub fn new(policy: AccessPolicy, azure_enabled: bool) -> Self {
        Self {
            policy,
            azure_enabled,
        }
    }

    pub fn azure_enabled(&self) -> bool {
        self.azure_enabled
    }

    /// Refreshes the session's Azure AD tokens when needed. A failed refresh
    /// leaves the session signed out.
    pub async fn context(&self, session: &UserSession) -> SessionContext {
        let identity = match session.azure() {
            Some(azure) if self.azure_enabled => match azure.ensure_fresh().await {
                Ok(_) => azure.identity().await,
                Err(err) => {
                    tracing::debug!(session_id = %session.id(), error = %err, "No Azure AD sign-in for session");
                    None
                }
            },
            _ => None,
        };

        SessionContext {
            session_id: session.id().to_string(),
            azure_enabled: self.azure_enabled,
            identity,
        }
    }

    pub fn admit(&self, context: &SessionContext) -> Result<AccessGrant, AccessError> {
        if !self.azure_enabled {
            return Ok(AccessGrant { identity: None });
        }

        let identity = context.identity.as_ref().ok_or(AccessError::SignInRequired)?;
        if !self.policy.permits(identity) {
            tracing::warn!(email = %identity.email, "Access denied by allow-list");
            return Err(AccessError::Denied(identity.email.clone()));
        }

        Ok(AccessGrant {
            identity: Some(identity.clone()),
        })
    }
}

use super::error::ConnectionError;
use crate::domain::oauth::{ConnectionStatus, OAuthError, OAuthSession};
use crate::infrastructure::salesforce::{ConnectionSource, PasswordLogin, SalesforceConnection};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
pub struct SalesforceStatus {
    pub oauth_configured: bool,
    pub oauth: Option<ConnectionStatus>,
    pub password_fallback: bool,
}

/// Resolves the Salesforce connection for a request.
///
/// Order: the OAuth session (refreshed when close to expiry), then a
/// username/password login kept in memory, otherwise not connected.
pub struct SalesforceConnector {
    oauth: Option<Arc<OAuthSession>>,
    password_login: Option<Arc<dyn PasswordLogin>>,
    password_session: Mutex<Option<SalesforceConnection>>,
}

impl SalesforceConnector {
    pub fn new(
        oauth: Option<Arc<OAuthSession>>,
        password_login: Option<Arc<dyn PasswordLogin>>,
    ) -> Self {
        Self {
            oauth,
            password_login,
            password_session: Mutex::new(None),
        }
    }

    pub fn oauth(&self) -> Option<&Arc<OAuthSession>> {
        self.oauth.as_ref()
    }

    pub async fn status(&self) -> SalesforceStatus {
        let oauth = match &self.oauth {
            Some(session) => Some(session.status().await),
            None => None,
        };
        SalesforceStatus {
            oauth_configured: self.oauth.is_some(),
            oauth,
            password_fallback: self.password_login.is_some(),
        }
    }

    pub async fn connect(&self) -> Result<SalesforceConnection, ConnectionError> {
        if let Some(session) = &self.oauth {
            match session.ensure_fresh().await {
                Ok(record) => {
                    let instance_url = record.instance_url.ok_or_else(|| {
                        ConnectionError::Dependency("token record has no instance URL".to_string())
                    })?;
                    return Ok(SalesforceConnection {
                        instance_url,
                        access_token: record.access_token,
                        source: ConnectionSource::OAuth,
                    });
                }
                Err(OAuthError::NotConnected) => {}
                Err(OAuthError::Rejected(reason)) if self.password_login.is_some() => {
                    tracing::warn!(reason = %reason, "OAuth refresh rejected, using password login");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(login) = &self.password_login {
            let mut cached = self.password_session.lock().await;
            if let Some(connection) = cached.as_ref() {
                return Ok(connection.clone());
            }
            let connection = login.login().await?;
            *cached = Some(connection.clone());
            return Ok(connection);
        }

        Err(ConnectionError::NotConnected {
            oauth_available: self.oauth.is_some(),
        })
    }

    /// Forget a connection the API reported as invalid.
    pub async fn invalidate(&self, connection: &SalesforceConnection) -> Result<(), ConnectionError> {
        match connection.source {
            ConnectionSource::OAuth => {
                if let Some(session) = &self.oauth {
                    session.invalidate("Salesforce reported an invalid session").await?;
                }
            }
            ConnectionSource::Password => {
                self.password_session.lock().await.take();
                tracing::warn!("Password session invalidated");
            }
        }
        Ok(())
    }
}

use super::error::OAuthError;
use super::identity::Identity;
use super::token::TokenRecord;
use crate::infrastructure::oauth::{OAuthProvider, ProviderError};
use crate::infrastructure::storage::TokenStore;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Unauthenticated,
    AwaitingCallback,
    Authenticated,
}

/// Logins that may be awaiting their callback at the same time.
const MAX_PENDING_STATES: usize = 8;

#[derive(Debug, Default)]
struct SessionState {
    record: Option<TokenRecord>,
    pending_states: VecDeque<String>,
    identity: Option<Identity>,
}

/// Token lifecycle for one provider and one application key.
///
/// All transitions go through a single async mutex, so two requests racing
/// on an expired token trigger one refresh and the second sees its result.
pub struct OAuthSession {
    app_key: String,
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn TokenStore>,
    refresh_skew: Duration,
    state: Mutex<SessionState>,
}

impl OAuthSession {
    /// Start from whatever the store holds for `app_key`.
    pub fn restore(
        app_key: impl Into<String>,
        provider: Arc<dyn OAuthProvider>,
        store: Arc<dyn TokenStore>,
        refresh_skew: Duration,
    ) -> Result<Self, OAuthError> {
        let app_key = app_key.into();
        let record = store.load(&app_key)?;
        if record.is_some() {
            tracing::info!(provider = %provider.name(), app_key = %app_key, "Restored stored OAuth tokens");
        }

        Ok(Self {
            app_key,
            provider,
            store,
            refresh_skew,
            state: Mutex::new(SessionState {
                record,
                ..SessionState::default()
            }),
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn status(&self) -> ConnectionStatus {
        let state = self.state.lock().await;
        if state.record.is_some() {
            ConnectionStatus::Authenticated
        } else if !state.pending_states.is_empty() {
            ConnectionStatus::AwaitingCallback
        } else {
            ConnectionStatus::Unauthenticated
        }
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    /// Provider login URL. `state` is accepted by one callback; the oldest
    /// outstanding state is dropped once too many logins are in flight.
    pub async fn build_authorization_url(&self, state: &str) -> String {
        let mut guard = self.state.lock().await;
        if guard.pending_states.len() >= MAX_PENDING_STATES {
            guard.pending_states.pop_front();
        }
        guard.pending_states.push_back(state.to_string());
        drop(guard);
        self.provider.authorization_url(state)
    }

    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<Option<Identity>, OAuthError> {
        let mut guard = self.state.lock().await;
        let Some(position) = guard.pending_states.iter().position(|pending| pending == state) else {
            tracing::warn!(provider = %self.provider.name(), "OAuth callback state mismatch");
            return Err(OAuthError::StateMismatch);
        };
        guard.pending_states.remove(position);

        let grant = self.provider.exchange_code(code).await?;

        let identity = match self.provider.fetch_identity(&grant).await {
            Ok(identity) => Some(identity),
            Err(err) if self.provider.identity_required() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(
                    provider = %self.provider.name(),
                    error = %err,
                    "Identity lookup failed, continuing without it"
                );
                None
            }
        };

        let record = TokenRecord::from_grant(&self.app_key, grant, Utc::now());
        if record.has_refresh_token() {
            self.store.save(&self.app_key, &record)?;
        } else {
            tracing::warn!(
                provider = %self.provider.name(),
                "No refresh token granted, connection will not survive a restart"
            );
        }

        tracing::info!(
            provider = %self.provider.name(),
            email = identity.as_ref().map(|i| i.email.as_str()).unwrap_or("-"),
            "OAuth connection established"
        );

        guard.record = Some(record);
        guard.identity = identity.clone();
        Ok(identity)
    }

    /// Current credentials, refreshed first when they expire within the skew window.
    pub async fn ensure_fresh(&self) -> Result<TokenRecord, OAuthError> {
        let mut guard = self.state.lock().await;
        let record = guard.record.clone().ok_or(OAuthError::NotConnected)?;

        if !record.needs_refresh(Utc::now(), self.refresh_skew) {
            return Ok(record);
        }

        if !record.has_refresh_token() {
            self.reset(&mut guard)?;
            return Err(OAuthError::Rejected("no refresh token available".to_string()));
        }

        match self.provider.refresh(&record.refresh_token).await {
            Ok(grant) => {
                let updated = record.refreshed(grant, Utc::now());
                self.store.save(&self.app_key, &updated)?;
                guard.record = Some(updated.clone());
                Ok(updated)
            }
            Err(ProviderError::Rejected(reason)) => {
                tracing::warn!(
                    provider = %self.provider.name(),
                    reason = %reason,
                    "Refresh token rejected, clearing stored tokens"
                );
                self.reset(&mut guard)?;
                Err(OAuthError::Rejected(reason))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn disconnect(&self) -> Result<(), OAuthError> {
        let mut guard = self.state.lock().await;
        self.reset(&mut guard)?;
        tracing::info!(provider = %self.provider.name(), "OAuth connection disconnected");
        Ok(())
    }

    /// Drop credentials the provider no longer honours, e.g. after an
    /// invalid-session API error.
    pub async fn invalidate(&self, reason: &str) -> Result<(), OAuthError> {
        let mut guard = self.state.lock().await;
        self.reset(&mut guard)?;
        tracing::warn!(provider = %self.provider.name(), reason = %reason, "OAuth connection invalidated");
        Ok(())
    }

    fn reset(&self, guard: &mut MutexGuard<'_, SessionState>) -> Result<(), OAuthError> {
        **guard = SessionState::default();
        self.store.clear(&self.app_key)?;
        Ok(())
    }
}

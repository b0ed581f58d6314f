use crate::domain::oauth::{OAuthError, OAuthSession};
use crate::infrastructure::oauth::OAuthProvider;
use crate::infrastructure::storage::MemoryTokenStore;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);
const MAX_SESSIONS: u64 = 10_000;

/// Per-browser state. Holds the Azure AD sign-in when the gate is enabled;
/// its tokens live in memory only.
pub struct UserSession {
    id: String,
    azure: Option<OAuthSession>,
    salesforce_state: Mutex<Option<String>>,
}

impl UserSession {
    fn new(id: String, azure: Option<OAuthSession>) -> Self {
        Self {
            id,
            azure,
            salesforce_state: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn azure(&self) -> Option<&OAuthSession> {
        self.azure.as_ref()
    }

    /// Remember the state this browser was sent to Salesforce with.
    pub async fn begin_salesforce_login(&self, state: &str) {
        *self.salesforce_state.lock().await = Some(state.to_string());
    }

    /// True when `state` is the one issued to this browser. A match is
    /// consumed, so each state completes at most one callback.
    pub async fn claim_salesforce_state(&self, state: &str) -> bool {
        let mut pending = self.salesforce_state.lock().await;
        if pending.as_deref() == Some(state) {
            *pending = None;
            true
        } else {
            false
        }
    }
}

pub struct SessionRegistry {
    sessions: Cache<String, Arc<UserSession>>,
    azure_provider: Option<Arc<dyn OAuthProvider>>,
    refresh_skew: chrono::Duration,
}

impl SessionRegistry {
    pub fn new(azure_provider: Option<Arc<dyn OAuthProvider>>, refresh_skew: chrono::Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(SESSION_IDLE_TIMEOUT)
            .build();

        Self {
            sessions,
            azure_provider,
            refresh_skew,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<UserSession>> {
        self.sessions.get(id).await
    }

    pub async fn create(&self) -> Result<Arc<UserSession>, OAuthError> {
        let id = Uuid::new_v4().to_string();
        let azure = match &self.azure_provider {
            Some(provider) => Some(OAuthSession::restore(
                format!("azure_ad:{}", id),
                provider.clone(),
                Arc::new(MemoryTokenStore::new()),
                self.refresh_skew,
            )?),
            None => None,
        };

        let session = Arc::new(UserSession::new(id.clone(), azure));
        self.sessions.insert(id, session.clone()).await;
        tracing::debug!(session_id = %session.id, "Browser session created");
        Ok(session)
    }
}

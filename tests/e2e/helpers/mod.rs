use ae_dashboard::app::build_app;
use ae_dashboard::infrastructure::config::Config;
use ae_dashboard::infrastructure::storage::FileTokenStore;
use anyhow::Result;
use hyper::StatusCode;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub mod api_client;
pub mod assertions;
pub mod azure_mocks;

use api_client::TestClient;

pub const APP_KEY: &str = "ae_dashboard";
pub const ALLOWED_DOMAIN: &str = "acme.com";

/// A running dashboard wired to a mocked Salesforce org (which serves as
/// both login host and instance) and, when gated, a mocked Azure AD tenant
/// that also answers Graph `/me`.
pub struct TestContext {
    pub client: TestClient,
    pub salesforce: MockServer,
    #[allow(dead_code)]
    pub azure: Option<MockServer>,
    pub config: Arc<Config>,
    tokens: TempDir,
}

impl TestContext {
    async fn start(gated: bool) -> Result<Self> {
        let salesforce = MockServer::start().await;
        let azure = if gated { Some(MockServer::start().await) } else { None };
        let tokens = tempfile::tempdir()?;

        let mut vars: HashMap<&str, String> = HashMap::from([
            ("SALESFORCE_CLIENT_ID", "test_client_id".to_string()),
            ("SALESFORCE_CLIENT_SECRET", "test_client_secret".to_string()),
            ("SALESFORCE_LOGIN_URL", salesforce.uri()),
            ("TOKEN_DIR", tokens.path().display().to_string()),
            ("TOKEN_APP_KEY", APP_KEY.to_string()),
            // Disable cache in tests to avoid test pollution
            ("DASHBOARD_CACHE_TTL_SECS", "0".to_string()),
        ]);
        if let Some(azure) = &azure {
            vars.insert("AZURE_CLIENT_ID", "test_azure_client".to_string());
            vars.insert("AZURE_TENANT_ID", "test-tenant".to_string());
            vars.insert("AZURE_CLIENT_SECRET", "test_azure_secret".to_string());
            vars.insert("AZURE_AUTHORITY", azure.uri());
            vars.insert("AZURE_GRAPH_URL", azure.uri());
            vars.insert("AZURE_ALLOWED_DOMAINS", ALLOWED_DOMAIN.to_string());
        }

        let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned())?);
        let client = spawn(config.clone()).await?;

        Ok(Self {
            client,
            salesforce,
            azure,
            config,
            tokens,
        })
    }

    /// Start a second server on the same token directory, as after a restart.
    pub async fn restart(&self) -> Result<TestClient> {
        spawn(self.config.clone()).await
    }

    pub fn token_path(&self) -> PathBuf {
        FileTokenStore::new(self.tokens.path()).token_path(APP_KEY)
    }

    /// A fresh browser against the same server, without a session cookie.
    #[allow(dead_code)]
    pub fn browser(&self) -> TestClient {
        TestClient::new(self.client.base_url())
    }

    /// Run the Salesforce OAuth flow against the mocked token endpoint.
    pub async fn connect_salesforce(&self) {
        self.connect_salesforce_as(&self.client).await;
    }

    pub async fn connect_salesforce_as(&self, client: &TestClient) {
        salesforce_mocks::mock_token_exchange(&self.salesforce).await;

        let state = self.salesforce_state(client).await;
        let response = client
            .get(&format!("/auth/salesforce/callback?code=test_code&state={}", state))
            .await
            .unwrap();
        response.assert_status(StatusCode::SEE_OTHER);
    }

    /// Start a Salesforce login and return the state it was issued.
    pub async fn salesforce_state(&self, client: &TestClient) -> String {
        let response = client.get("/auth/salesforce/connect").await.unwrap();
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assertions::query_param(response.redirect_location(), "state")
            .expect("Missing state in authorize URL")
    }

    /// Sign this client's browser session in through the mocked Azure AD.
    #[allow(dead_code)]
    pub async fn sign_in(&self, display_name: &str, email: &str) {
        self.sign_in_as(&self.client, display_name, email).await;
    }

    #[allow(dead_code)]
    pub async fn sign_in_as(&self, client: &TestClient, display_name: &str, email: &str) {
        let azure = self.azure.as_ref().expect("Azure AD is not configured");
        azure_mocks::mock_sign_in(azure, display_name, email).await;

        let response = client.get("/auth/azure/login").await.unwrap();
        let state = assertions::query_param(response.redirect_location(), "state")
            .expect("Missing state in authorize URL");

        let response = client
            .get(&format!(
                "/auth/azure/callback?code={}&state={}",
                azure_mocks::sign_in_code(email),
                state
            ))
            .await
            .unwrap();
        response.assert_status(StatusCode::SEE_OTHER);
    }
}

async fn spawn(config: Arc<Config>) -> Result<TestClient> {
    let app = build_app(config)?;

    // Start server
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait for server to be ready
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(TestClient::new(&base_url))
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            TestContext::start(false)
                .await
                .expect("Failed to start test server")
        }
    }
}

/// Same as [`TestContext`] with the Azure AD gate enabled for `acme.com`.
pub struct GatedTestContext(pub TestContext);

impl std::ops::Deref for GatedTestContext {
    type Target = TestContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsyncTestContext for GatedTestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            GatedTestContext(
                TestContext::start(true)
                    .await
                    .expect("Failed to start gated test server"),
            )
        }
    }
}

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    controllers::{
        dashboard::DashboardController, oauth::OAuthController, session::SessionController,
    },
    domain::{
        access::{AccessGate, AccessPolicy},
        dashboard::{CalculationSettings, DashboardService, DashboardServiceApi, QuerySettings},
        oauth::OAuthSession,
        salesforce::SalesforceConnector,
    },
    infrastructure::{
        config::Config,
        http::build_router,
        oauth::{OAuthClient, OAuthProvider, ProviderConfig},
        salesforce::{PasswordLogin, SalesforceRestClient, SoapPasswordLogin, SoqlExecutor},
        session::SessionRegistry,
        storage::{FileTokenStore, TokenStore},
    },
};

/// Wire clients, services and controllers into the application router.
///
/// Restores any stored Salesforce tokens, so a previous connection survives
/// a restart.
pub fn build_app(config: Arc<Config>) -> anyhow::Result<Router> {
    let refresh_skew = chrono::Duration::seconds(config.tokens.refresh_skew_secs);

    // 1. Token storage and OAuth providers
    let token_store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.tokens.dir.clone()));

    let salesforce_oauth = match ProviderConfig::salesforce(&config.salesforce) {
        Some(provider_config) => {
            let provider: Arc<dyn OAuthProvider> = Arc::new(OAuthClient::new(provider_config));
            Some(Arc::new(OAuthSession::restore(
                config.tokens.app_key.clone(),
                provider,
                token_store.clone(),
                refresh_skew,
            )?))
        }
        None => {
            tracing::info!("Salesforce OAuth not configured, using password login only");
            None
        }
    };

    let password_login: Option<Arc<dyn PasswordLogin>> = config
        .salesforce
        .password_credentials()
        .map(|credentials| -> Arc<dyn PasswordLogin> {
            Arc::new(SoapPasswordLogin::new(
                config.salesforce.login_url.clone(),
                config.salesforce.api_version.clone(),
                credentials,
            ))
        });

    let azure_provider: Option<Arc<dyn OAuthProvider>> = config.azure.as_ref().map(|azure| {
        let provider: Arc<dyn OAuthProvider> = Arc::new(OAuthClient::new(ProviderConfig::azure_ad(azure)));
        provider
    });
    if azure_provider.is_none() {
        tracing::warn!("Azure AD not configured, dashboard is open to anyone who can reach it");
    }

    // 2. Services
    let executor: Arc<dyn SoqlExecutor> =
        Arc::new(SalesforceRestClient::new(config.salesforce.api_version.clone()));
    let dashboard_service: Arc<dyn DashboardServiceApi> = Arc::new(DashboardService::new(
        executor,
        QuerySettings {
            closed_won_stage: config.salesforce.closed_won_stage.clone(),
            sales_department: config.salesforce.sales_department.clone(),
            meeting_keywords: config.salesforce.meeting_keywords.clone(),
        },
        Duration::from_secs(config.dashboard.cache_ttl_secs),
    ));
    let connector = Arc::new(SalesforceConnector::new(salesforce_oauth, password_login));

    let policy = match &config.azure {
        Some(azure) => AccessPolicy::new(azure.allowed_domains.clone(), azure.allowed_emails.clone()),
        None => AccessPolicy::default(),
    };
    let gate = Arc::new(AccessGate::new(policy, azure_provider.is_some()));
    let sessions = Arc::new(SessionRegistry::new(azure_provider, refresh_skew));

    // 3. Controllers
    let dashboard_controller = Arc::new(DashboardController::new(
        dashboard_service.clone(),
        connector.clone(),
        gate.clone(),
        CalculationSettings::from_config(&config.dashboard),
        config.debug,
    ));
    let oauth_controller = Arc::new(OAuthController::new(
        connector.clone(),
        dashboard_service,
        gate.clone(),
    ));
    let session_controller = Arc::new(SessionController::new(gate, connector.clone()));

    Ok(build_router(
        sessions,
        connector,
        dashboard_controller,
        oauth_controller,
        session_controller,
    ))
}

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::infrastructure::config::Config;
use crate::infrastructure::session::SessionRegistry;
use crate::{
    controllers::{
        dashboard::DashboardController, health, oauth::OAuthController, session::SessionController,
    },
    domain::salesforce::SalesforceConnector,
    infrastructure::auth::{request_id_middleware, session_middleware},
};

/// Assemble every route. Everything except the health checks reads the
/// browser session, so it sits behind the session middleware.
pub fn build_router(
    sessions: Arc<SessionRegistry>,
    connector: Arc<SalesforceConnector>,
    dashboard_controller: Arc<DashboardController>,
    oauth_controller: Arc<OAuthController>,
    session_controller: Arc<SessionController>,
) -> Router {
    // Dashboard routes (need a browser session)
    let dashboard_routes = Router::new()
        .route("/", get(DashboardController::index))
        .route("/api/dashboard", get(DashboardController::report))
        .route("/api/dashboard/export.csv", get(DashboardController::export_csv))
        .with_state(dashboard_controller);

    let session_routes = Router::new()
        .route("/api/session", get(SessionController::status))
        .with_state(session_controller);

    // Azure AD sign-in is per browser session
    let azure_routes = Router::new()
        .route("/auth/azure/login", get(OAuthController::azure_login))
        .route("/auth/azure/callback", get(OAuthController::azure_callback))
        .route("/auth/azure/logout", post(OAuthController::azure_logout))
        .with_state(oauth_controller.clone());

    // Salesforce connection is process-wide, managed by admitted users only
    let salesforce_routes = Router::new()
        .route("/auth/salesforce/connect", get(OAuthController::salesforce_connect))
        .route("/auth/salesforce/callback", get(OAuthController::salesforce_callback))
        .route(
            "/auth/salesforce/disconnect",
            post(OAuthController::salesforce_disconnect),
        )
        .with_state(oauth_controller);

    let browser_routes = Router::new()
        .merge(dashboard_routes)
        .merge(session_routes)
        .merge(azure_routes)
        .merge(salesforce_routes)
        .layer(middleware::from_fn_with_state(sessions, session_middleware));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(connector)
        .merge(browser_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(config: Arc<Config>, app: Router) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

use crate::e2e::helpers;

use helpers::assertions::query_param;
use helpers::salesforce_mocks::{mock_march_dataset, QUERY_PATH};
use helpers::GatedTestContext;
use hyper::StatusCode;
use test_context::test_context;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_require_sign_in_for_report(ctx: &GatedTestContext) {
    let response = ctx.client.get("/api/dashboard").await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Sign in with Microsoft is required");
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_show_sign_in_page(ctx: &GatedTestContext) {
    let response = ctx.client.get("/").await.unwrap();

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("/auth/azure/login"));
    assert!(response.text().contains("Sign in with Microsoft"));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_redirect_to_azure_sign_in(ctx: &GatedTestContext) {
    let azure = ctx.azure.as_ref().unwrap();

    let response = ctx.client.get("/auth/azure/login").await.unwrap();
    response.assert_status(StatusCode::TEMPORARY_REDIRECT);

    let location = response.redirect_location();
    assert!(
        location.starts_with(&format!("{}/oauth2/v2.0/authorize?", azure.uri())),
        "Location should point to the Azure AD tenant, got: {}",
        location
    );
    assert_eq!(query_param(location, "client_id").as_deref(), Some("test_azure_client"));
    assert_eq!(query_param(location, "response_mode").as_deref(), Some("query"));
    assert!(query_param(location, "scope").is_some_and(|s| s.contains("offline_access")));
    assert!(ctx.client.session_cookie().is_some(), "Sign-in should be bound to a browser session");
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_report_signed_in_user(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "jane@acme.com").await;

    let response = ctx.client.get("/api/session").await.unwrap();
    response.assert_status(StatusCode::OK);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["access"].as_str(), Some("granted"));
    assert_eq!(body["azure_enabled"].as_bool(), Some(true));
    assert_eq!(body["identity"]["email"].as_str(), Some("jane@acme.com"));
    assert_eq!(body["identity"]["display_name"].as_str(), Some("Jane Doe"));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_deny_users_outside_allowed_domains(ctx: &GatedTestContext) {
    let jane = ctx.browser();
    ctx.sign_in_as(&jane, "Jane Doe", "jane@acme.com").await;
    ctx.connect_salesforce_as(&jane).await;
    ctx.sign_in("Mallory", "mallory@evil.com").await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.salesforce)
        .await;

    let response = ctx.client.get("/api/dashboard").await.unwrap();
    response
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error_message("mallory@evil.com");

    let response = ctx.client.get("/").await.unwrap();
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(response.text().contains("mallory@evil.com"));

    let response = ctx.client.get("/api/session").await.unwrap();
    assert_eq!(response.body.as_ref().unwrap()["access"].as_str(), Some("denied"));

    ctx.salesforce.verify().await;
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_require_sign_in_to_manage_salesforce_connection(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "jane@acme.com").await;
    ctx.connect_salesforce().await;

    let anonymous = ctx.browser();
    let response = anonymous.post("/auth/salesforce/disconnect").await.unwrap();
    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Sign in with Microsoft is required");
    assert!(ctx.token_path().exists(), "Anonymous disconnect must keep the tokens");

    let response = anonymous.get("/auth/salesforce/connect").await.unwrap();
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = ctx.client.get("/api/session").await.unwrap();
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["salesforce"]["oauth"].as_str(), Some("authenticated"));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_not_let_denied_users_manage_salesforce_connection(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "jane@acme.com").await;
    ctx.connect_salesforce().await;

    let mallory = ctx.browser();
    ctx.sign_in_as(&mallory, "Mallory", "mallory@evil.com").await;

    let response = mallory.post("/auth/salesforce/disconnect").await.unwrap();
    response
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error_message("mallory@evil.com");
    assert!(ctx.token_path().exists(), "Denied disconnect must keep the tokens");

    let response = mallory.get("/auth/salesforce/connect").await.unwrap();
    response.assert_status(StatusCode::FORBIDDEN);

    let response = mallory
        .get("/auth/salesforce/callback?code=attacker_code&state=any")
        .await
        .unwrap();
    response.assert_status(StatusCode::FORBIDDEN);
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_admit_users_from_allowed_domains(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "Jane@ACME.com").await;
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get("/api/dashboard?month=3&year=2026").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.body.as_ref().unwrap()["total_rows"].as_u64(), Some(1));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_keep_sign_in_per_browser_session(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "jane@acme.com").await;

    // Same server, fresh browser without the session cookie
    let other = helpers::api_client::TestClient::new(ctx.client.base_url());
    let response = other.get("/api/session").await.unwrap();

    assert_eq!(response.body.as_ref().unwrap()["access"].as_str(), Some("sign_in_required"));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_sign_out(ctx: &GatedTestContext) {
    ctx.sign_in("Jane Doe", "jane@acme.com").await;

    let response = ctx.client.post("/auth/azure/logout").await.unwrap();
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.redirect_location(), "/");

    let response = ctx.client.get("/api/session").await.unwrap();
    assert_eq!(response.body.as_ref().unwrap()["access"].as_str(), Some("sign_in_required"));
}

#[test_context(GatedTestContext)]
#[tokio::test]
async fn it_should_reject_azure_callback_with_unknown_state(ctx: &GatedTestContext) {
    ctx.client.get("/auth/azure/login").await.unwrap();
    let response = ctx
        .client
        .get("/auth/azure/callback?code=azure_code&state=forged")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Please reconnect");
}

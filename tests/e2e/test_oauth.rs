use crate::e2e::helpers;

use helpers::assertions::query_param;
use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_redirect_to_salesforce_login(ctx: &TestContext) {
    let response = ctx.client.get("/auth/salesforce/connect").await.unwrap();
    response.assert_status(StatusCode::TEMPORARY_REDIRECT);

    let location = response.redirect_location();
    assert!(
        location.starts_with(&format!("{}/services/oauth2/authorize?", ctx.salesforce.uri())),
        "Location should point to the Salesforce login host, got: {}",
        location
    );
    assert_eq!(query_param(location, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(location, "client_id").as_deref(), Some("test_client_id"));
    assert_eq!(query_param(location, "prompt").as_deref(), Some("login"));
    assert_eq!(
        query_param(location, "scope").as_deref(),
        Some("api refresh_token offline_access")
    );
    assert!(query_param(location, "state").is_some(), "Should include state parameter");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_use_fresh_state_for_each_login(ctx: &TestContext) {
    let first = ctx.client.get("/auth/salesforce/connect").await.unwrap();
    let second = ctx.client.get("/auth/salesforce/connect").await.unwrap();

    assert_ne!(
        query_param(first.redirect_location(), "state"),
        query_param(second.redirect_location(), "state")
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_callback_with_unknown_state(ctx: &TestContext) {
    helpers::salesforce_mocks::mock_token_exchange(&ctx.salesforce).await;

    ctx.client.get("/auth/salesforce/connect").await.unwrap();
    let response = ctx
        .client
        .get("/auth/salesforce/callback?code=test_code&state=forged")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Please reconnect");
    assert!(!ctx.token_path().exists(), "Nothing should be stored on state mismatch");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_callback_from_another_browser(ctx: &TestContext) {
    helpers::salesforce_mocks::mock_token_exchange(&ctx.salesforce).await;

    let other = ctx.browser();
    let state = ctx.salesforce_state(&other).await;

    let response = ctx
        .client
        .get(&format!("/auth/salesforce/callback?code=attacker_code&state={}", state))
        .await
        .unwrap();
    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Please reconnect");
    assert!(!ctx.token_path().exists(), "Nothing should be stored for a foreign state");

    // The state still completes in the browser it was issued to
    let response = other
        .get(&format!("/auth/salesforce/callback?code=test_code&state={}", state))
        .await
        .unwrap();
    response.assert_status(StatusCode::SEE_OTHER);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_complete_logins_started_by_two_browsers(ctx: &TestContext) {
    helpers::salesforce_mocks::mock_token_exchange(&ctx.salesforce).await;

    let other = ctx.browser();
    let first = ctx.salesforce_state(&ctx.client).await;
    let second = ctx.salesforce_state(&other).await;

    for (client, state) in [(&ctx.client, first), (&other, second)] {
        let response = client
            .get(&format!("/auth/salesforce/callback?code=test_code&state={}", state))
            .await
            .unwrap();
        response.assert_status(StatusCode::SEE_OTHER);
    }
    assert!(ctx.token_path().exists());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_denied_authorization(ctx: &TestContext) {
    let response = ctx
        .client
        .get("/auth/salesforce/callback?error=access_denied&error_description=end-user+denied+authorization")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("end-user denied authorization");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_callback_without_code(ctx: &TestContext) {
    let response = ctx.client.get("/auth/salesforce/callback?state=abc").await.unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_connect_and_persist_tokens(ctx: &TestContext) {
    ctx.connect_salesforce().await;

    assert!(ctx.token_path().exists(), "Token file should be written");
    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(ctx.token_path()).unwrap()).unwrap();
    assert_eq!(
        stored.get("refresh_token").and_then(|v| v.as_str()),
        Some("5Aep_test_refresh_token")
    );
    assert_eq!(
        stored.get("instance_url").and_then(|v| v.as_str()),
        Some(ctx.salesforce.uri().as_str())
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(ctx.token_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let response = ctx.client.get("/api/session").await.unwrap();
    response.assert_status(StatusCode::OK);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["salesforce"]["oauth"].as_str(), Some("authenticated"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_restore_connection_after_restart(ctx: &TestContext) {
    ctx.connect_salesforce().await;

    let restarted = ctx.restart().await.unwrap();
    let response = restarted.get("/api/session").await.unwrap();

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["salesforce"]["oauth"].as_str(), Some("authenticated"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_disconnect_idempotently(ctx: &TestContext) {
    ctx.connect_salesforce().await;

    let response = ctx.client.post("/auth/salesforce/disconnect").await.unwrap();
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.redirect_location(), "/");
    assert!(!ctx.token_path().exists(), "Token file should be removed");

    let response = ctx.client.post("/auth/salesforce/disconnect").await.unwrap();
    response.assert_status(StatusCode::SEE_OTHER);

    let response = ctx.client.get("/api/dashboard").await.unwrap();
    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Salesforce is not connected");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_offer_azure_sign_in_when_not_configured(ctx: &TestContext) {
    let response = ctx.client.get("/auth/azure/login").await.unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("Azure AD sign-in is not configured");
}

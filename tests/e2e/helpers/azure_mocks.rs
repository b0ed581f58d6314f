use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Authorization code the mocked tenant hands out for `email`.
pub fn sign_in_code(email: &str) -> String {
    format!("azure_{}", email.replace(['@', '.'], "_"))
}

/// Token endpoint and Graph `/me` for one signed-in user. Each user gets
/// their own code and access token, so several browsers can sign in.
pub async fn mock_sign_in(server: &MockServer, display_name: &str, email: &str) {
    let code = sign_in_code(email);
    let access_token = format!("{}_access_token", code);

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={}&", code)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": access_token,
            "refresh_token": "azure_test_refresh_token",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", format!("Bearer {}", access_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "displayName": display_name,
            "mail": email,
            "userPrincipalName": email,
        })))
        .mount(server)
        .await;
}

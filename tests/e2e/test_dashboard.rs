use crate::e2e::helpers;

use helpers::assertions::{assert_decimal, assert_report_shape, first_row};
use helpers::salesforce_mocks::{mock_march_dataset, mock_query_error};
use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

const MARCH: &str = "month=3&year=2026";

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_require_salesforce_connection_for_report(ctx: &TestContext) {
    let response = ctx.client.get("/api/dashboard").await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Salesforce is not connected");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_offer_salesforce_connect_page_when_not_connected(ctx: &TestContext) {
    let response = ctx.client.get("/").await.unwrap();

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Connect with Salesforce"));
    assert!(response.text().contains("/auth/salesforce/connect"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_quota_report_for_month(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/api/dashboard?{}", MARCH)).await.unwrap();
    response.assert_status(StatusCode::OK);

    let report = response.body.as_ref().unwrap();
    assert_report_shape(report);
    assert_eq!(report["period"]["year"].as_i64(), Some(2026));
    assert_eq!(report["period"]["month"].as_u64(), Some(3));
    assert_eq!(report["date_range"][0].as_str(), Some("2026-03-01"));
    assert_eq!(report["date_range"][1].as_str(), Some("2026-03-31"));
    assert_eq!(report["connection_source"].as_str(), Some("oauth"));
    assert_eq!(report["total_rows"].as_u64(), Some(1));
    assert_eq!(report["warnings"].as_array().map(|w| w.len()), Some(0));

    let row = first_row(report);
    assert_eq!(row["name"].as_str(), Some("Alice Smith"));
    assert_eq!(row["manager_name"].as_str(), Some("Mona Lee"));
    assert_decimal(row, "monthly_quota", 10000);
    assert_decimal(row, "forecast_amount", 8000);
    assert_decimal(row, "percent_to_quota", 80);
    assert_decimal(row, "closed_won", 3000);
    assert_decimal(row, "remaining_quota", 7000);
    assert_decimal(row, "pipeline_coverage_ratio", 3);
    assert_decimal(row, "pipeline_should_have", 21000);
    assert_decimal(row, "open_pipeline", 15000);
    assert_decimal(row, "pipeline_gap", 6000);
    assert_eq!(row["activity_email"].as_u64(), Some(4));
    assert_eq!(row["meetings_needed"].as_i64(), Some(7));
    assert_eq!(row["meetings_scheduled"].as_i64(), Some(2));
    assert_eq!(row["meeting_gap"].as_i64(), Some(-5));

    assert_eq!(report["managers"][0].as_str(), Some("Mona Lee"));
    assert_eq!(report["rep_names"][0].as_str(), Some("Alice Smith"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_render_dashboard_page(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/?{}", MARCH)).await.unwrap();
    response.assert_status(StatusCode::OK);

    let html = response.text();
    assert!(html.contains("March 2026"));
    assert!(html.contains("Alice Smith"));
    assert!(html.contains("$7,000"));
    assert!(html.contains("80.0%"));
    assert!(html.contains("/api/dashboard/export.csv?"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_export_csv_attachment(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx
        .client
        .get(&format!("/api/dashboard/export.csv?{}", MARCH))
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);

    assert!(response
        .header("content-type")
        .is_some_and(|v| v.starts_with("text/csv")));
    assert_eq!(
        response.header("content-disposition").map(String::as_str),
        Some("attachment; filename=\"ae_dashboard_2026_03.csv\"")
    );

    let csv = response.text();
    let mut lines = csv.lines();
    assert!(lines.next().is_some_and(|header| header.starts_with("AE Name,Manager Name,")));
    assert!(lines.next().is_some_and(|row| row.starts_with("Alice Smith,Mona Lee,")));
    assert!(lines.next().is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_filter_rows_without_changing_totals(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx
        .client
        .get(&format!("/api/dashboard?{}&manager=Nobody", MARCH))
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);

    let report = response.body.as_ref().unwrap();
    assert_eq!(report["rows"].as_array().map(|r| r.len()), Some(0));
    assert_eq!(report["total_rows"].as_u64(), Some(1));
    assert_decimal(&report["summary"], "total_quota", 10000);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_apply_calculation_overrides(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx
        .client
        .get(&format!("/api/dashboard?{}&avg_deal_size=7000&win_rate=0.5", MARCH))
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);

    // 7000 / 7000 / 0.5
    let report = response.body.as_ref().unwrap();
    assert_eq!(first_row(report)["meetings_needed"].as_i64(), Some(2));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_warn_when_forecast_is_unavailable(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_query_error(&ctx.salesforce, "FROM ForecastingItem", 400, "INVALID_TYPE").await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/api/dashboard?{}", MARCH)).await.unwrap();
    response.assert_status(StatusCode::OK);

    let report = response.body.as_ref().unwrap();
    let warnings = report["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("ForecastingItem"));

    let row = first_row(report);
    assert_decimal(row, "forecast_amount", 0);
    assert_decimal(row, "percent_to_quota", 0);
    assert_decimal(row, "remaining_quota", 7000);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_when_required_query_fails(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_query_error(&ctx.salesforce, "FROM User", 400, "INVALID_FIELD").await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/api/dashboard?{}", MARCH)).await.unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_message("INVALID_FIELD");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_drop_connection_when_salesforce_session_expires(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    mock_query_error(&ctx.salesforce, "StageName = 'Closed/Won'", 401, "INVALID_SESSION_ID").await;
    mock_march_dataset(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/api/dashboard?{}", MARCH)).await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Please reconnect");
    assert!(!ctx.token_path().exists(), "Stored tokens should be cleared");

    let response = ctx.client.get("/api/dashboard").await.unwrap();
    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Salesforce is not connected");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_empty_report_when_nobody_has_opportunities(ctx: &TestContext) {
    ctx.connect_salesforce().await;
    helpers::salesforce_mocks::mock_empty_queries(&ctx.salesforce).await;

    let response = ctx.client.get(&format!("/api/dashboard?{}", MARCH)).await.unwrap();
    response.assert_status(StatusCode::OK);

    let report = response.body.as_ref().unwrap();
    assert_eq!(report["total_rows"].as_u64(), Some(0));
    assert_eq!(report["summary"]["rep_count"].as_u64(), Some(0));
}

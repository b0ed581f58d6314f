use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    controllers::views::{csv, pages},
    domain::{
        access::{AccessGate, SessionContext},
        dashboard::{
            CalculationSettings, DashboardReport, DashboardServiceApi, DashboardServiceError,
            LoadedReport, Range, ReportingPeriod, RowFilter,
        },
        salesforce::SalesforceConnector,
    },
    error::{AppError, AppResult},
    infrastructure::{auth::CurrentSession, salesforce::ConnectionSource},
};

/// Dashboard query parameters. Parsing is lenient: values that do not parse
/// are ignored and the defaults apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQuery {
    pub month: Option<String>,
    pub year: Option<String>,
    pub debug: bool,
    pub avg_deal_size: Option<Decimal>,
    pub win_rate: Option<Decimal>,
    pub filter: RowFilter,
}

impl DashboardQuery {
    /// Managers and reps may repeat (`manager=A&manager=B`).
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();
        let mut bounds: Vec<(&str, &str)> = Vec::new();

        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "month" => query.month = Some(value.to_string()),
                "year" => query.year = Some(value.to_string()),
                "debug" => query.debug = matches!(value, "1" | "true" | "yes" | "on"),
                "avg_deal_size" => {
                    query.avg_deal_size = decimal(value).filter(|v| *v > Decimal::ZERO)
                }
                "win_rate" => {
                    query.win_rate =
                        decimal(value).filter(|v| *v > Decimal::ZERO && *v <= Decimal::ONE)
                }
                "manager" if !value.is_empty() => query.filter.managers.push(value.to_string()),
                "rep" if !value.is_empty() => query.filter.reps.push(value.to_string()),
                other => bounds.push((other, value)),
            }
        }

        for (key, value) in bounds {
            let filter = &mut query.filter;
            match key {
                "min_percent" => filter.percent_to_quota.min = decimal(value),
                "max_percent" => filter.percent_to_quota.max = decimal(value),
                "min_closed_won" => filter.closed_won.min = decimal(value),
                "max_closed_won" => filter.closed_won.max = decimal(value),
                "min_pipeline" => filter.open_pipeline.min = decimal(value),
                "max_pipeline" => filter.open_pipeline.max = decimal(value),
                "min_meetings" => filter.meetings_scheduled.min = value.parse().ok(),
                "max_meetings" => filter.meetings_scheduled.max = value.parse().ok(),
                _ => {}
            }
        }

        query
    }

    pub fn period(&self, today: chrono::NaiveDate) -> ReportingPeriod {
        ReportingPeriod::from_query(self.year.as_deref(), self.month.as_deref(), today)
    }

    pub fn settings(&self, defaults: &CalculationSettings) -> CalculationSettings {
        CalculationSettings {
            avg_deal_size: self.avg_deal_size.unwrap_or(defaults.avg_deal_size),
            win_rate: self.win_rate.unwrap_or(defaults.win_rate),
            ..defaults.clone()
        }
    }

    /// Query string reproducing the selection for `period`, debug excluded.
    pub fn to_query_string(&self, period: ReportingPeriod) -> String {
        let mut pairs = vec![
            ("month".to_string(), period.month.to_string()),
            ("year".to_string(), period.year.to_string()),
        ];
        if let Some(v) = self.avg_deal_size {
            pairs.push(("avg_deal_size".to_string(), v.normalize().to_string()));
        }
        if let Some(v) = self.win_rate {
            pairs.push(("win_rate".to_string(), v.normalize().to_string()));
        }
        for manager in &self.filter.managers {
            pairs.push(("manager".to_string(), manager.clone()));
        }
        for rep in &self.filter.reps {
            pairs.push(("rep".to_string(), rep.clone()));
        }
        push_bounds(&mut pairs, "percent", &self.filter.percent_to_quota);
        push_bounds(&mut pairs, "closed_won", &self.filter.closed_won);
        push_bounds(&mut pairs, "pipeline", &self.filter.open_pipeline);
        push_bounds(&mut pairs, "meetings", &self.filter.meetings_scheduled);

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn push_bounds<T: std::fmt::Display + PartialOrd + Copy>(
    pairs: &mut Vec<(String, String)>,
    name: &str,
    range: &Range<T>,
) {
    if let Some(min) = range.min {
        pairs.push((format!("min_{}", name), min.to_string()));
    }
    if let Some(max) = range.max {
        pairs.push((format!("max_{}", name), max.to_string()));
    }
}

fn decimal(value: &str) -> Option<Decimal> {
    if value.is_empty() {
        return None;
    }
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub report: DashboardReport,
    pub connection_source: ConnectionSource,
    pub from_cache: bool,
    pub elapsed_ms: u64,
}

struct Loaded {
    context: SessionContext,
    query: DashboardQuery,
    report: LoadedReport,
    source: ConnectionSource,
}

pub struct DashboardController {
    dashboard_service: Arc<dyn DashboardServiceApi>,
    connector: Arc<SalesforceConnector>,
    gate: Arc<AccessGate>,
    defaults: CalculationSettings,
    debug: bool,
}

impl DashboardController {
    pub fn new(
        dashboard_service: Arc<dyn DashboardServiceApi>,
        connector: Arc<SalesforceConnector>,
        gate: Arc<AccessGate>,
        defaults: CalculationSettings,
        debug: bool,
    ) -> Self {
        Self {
            dashboard_service,
            connector,
            gate,
            defaults,
            debug,
        }
    }

    /// GET / - Dashboard page
    pub async fn index(
        State(controller): State<Arc<DashboardController>>,
        Extension(session): Extension<CurrentSession>,
        Query(pairs): Query<Vec<(String, String)>>,
    ) -> Response {
        let context = controller.gate.context(&session.0).await;
        let query = DashboardQuery::from_pairs(&pairs);

        match controller.load(context.clone(), query).await {
            Ok(loaded) => {
                let period = loaded.report.report.period;
                let salesforce = controller.connector.status().await;
                let query_string = loaded.query.to_query_string(period);
                let html = pages::dashboard(&pages::DashboardPage {
                    report: &loaded.report.report,
                    filter: &loaded.query.filter,
                    session: &loaded.context,
                    salesforce: &salesforce,
                    source: loaded.source,
                    query: &query_string,
                    from_cache: loaded.report.from_cache,
                    elapsed: loaded.report.elapsed,
                    debug: controller.debug || loaded.query.debug,
                });
                Html(html).into_response()
            }
            Err(err) => error_page(&context, err),
        }
    }

    /// GET /api/dashboard - Report as JSON
    pub async fn report(
        State(controller): State<Arc<DashboardController>>,
        Extension(session): Extension<CurrentSession>,
        Query(pairs): Query<Vec<(String, String)>>,
    ) -> AppResult<Json<DashboardResponse>> {
        let context = controller.gate.context(&session.0).await;
        let loaded = controller
            .load(context, DashboardQuery::from_pairs(&pairs))
            .await?;

        Ok(Json(DashboardResponse {
            connection_source: loaded.source,
            from_cache: loaded.report.from_cache,
            elapsed_ms: loaded.report.elapsed.as_millis() as u64,
            report: loaded.report.report,
        }))
    }

    /// GET /api/dashboard/export.csv - Filtered rows as a CSV attachment
    pub async fn export_csv(
        State(controller): State<Arc<DashboardController>>,
        Extension(session): Extension<CurrentSession>,
        Query(pairs): Query<Vec<(String, String)>>,
    ) -> AppResult<Response> {
        let context = controller.gate.context(&session.0).await;
        let loaded = controller
            .load(context, DashboardQuery::from_pairs(&pairs))
            .await?;

        let report = &loaded.report.report;
        let disposition = format!(
            "attachment; filename=\"{}\"",
            csv::filename(report.period.year, report.period.month)
        );

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv::render(&report.rows),
        )
            .into_response())
    }

    async fn load(&self, context: SessionContext, query: DashboardQuery) -> AppResult<Loaded> {
        let grant = self.gate.admit(&context)?;
        let connection = self.connector.connect().await?;

        let period = query.period(chrono::Utc::now().date_naive());
        let settings = query.settings(&self.defaults);

        let report = match self
            .dashboard_service
            .load_report(&grant, &connection, period, &settings, &query.filter)
            .await
        {
            Ok(report) => report,
            Err(DashboardServiceError::SessionExpired) => {
                self.connector.invalidate(&connection).await?;
                self.dashboard_service.invalidate_cache().await;
                return Err(AppError::Unauthorized("Salesforce session expired".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Loaded {
            context,
            query,
            report,
            source: connection.source,
        })
    }
}

fn error_page(context: &SessionContext, err: AppError) -> Response {
    let status = err.status_code();
    let html = match &err {
        AppError::SignInRequired => pages::sign_in(context),
        AppError::AccessDenied(email) => pages::access_denied(context, email),
        AppError::SalesforceNotConnected { oauth_available } => {
            pages::connect_salesforce(context, *oauth_available)
        }
        AppError::Unauthorized(_) => pages::error(context, &err.to_string(), true),
        _ => pages::error(context, &err.to_string(), false),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, status = %status.as_u16(), "Dashboard page failed");
    } else {
        tracing::debug!(error = %err, status = %status.as_u16(), "Dashboard page not shown");
    }

    (status, Html(html)).into_response()
}

pub mod calculations;
pub mod error;
pub mod filter;
pub mod model;
pub mod period;
pub mod service;

pub use error::DashboardServiceError;
pub use filter::{Range, RowFilter};
pub use model::{
    CalculationSettings, DashboardReport, DashboardSummary, Insights, QuotaRow, RawDashboardData,
    RemainderPolicy, SalesRep,
};
pub use period::ReportingPeriod;
pub use service::{DashboardService, DashboardServiceApi, LoadedReport, QuerySettings};

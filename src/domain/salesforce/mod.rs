pub mod connector;
pub mod error;

pub use connector::{SalesforceConnector, SalesforceStatus};
pub use error::ConnectionError;

pub mod access;
pub mod dashboard;
pub mod oauth;
pub mod salesforce;

pub mod auth;
pub mod config;
pub mod http;
pub mod oauth;
pub mod salesforce;
pub mod session;
pub mod storage;

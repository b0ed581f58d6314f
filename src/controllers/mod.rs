pub mod dashboard;
pub mod health;
pub mod oauth;
pub mod session;
pub mod views;

mod helpers;
mod test_access;
mod test_dashboard;
mod test_oauth;

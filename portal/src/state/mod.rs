//! View state for the portal: the session controller plus the per-view
//! loaders for the developer dashboard and the admin overview.

pub mod admin;
pub mod dashboard;
pub mod session;
pub mod token_store;

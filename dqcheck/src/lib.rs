//! Data quality checks for Magento and ERP databases.
//!
//! Each check runs one query-and-classify pass against a configured MySQL
//! database and reports findings as [`types::Issue`] values. The manager
//! aggregates issues across checks and the reporter renders them into an
//! HTML email delivered through Microsoft Graph.

pub mod checks;
pub mod cli;
pub mod config;
pub mod db;
pub mod mailer;
pub mod manager;
pub mod reporter;
pub mod types;

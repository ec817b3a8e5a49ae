pub mod analytics;
pub mod core;
pub mod dashboard;
pub mod reports;

pub mod analyzer;
pub mod config;
pub mod dashboard;
pub mod feed;
pub mod insights;
pub mod models;
pub mod server;
pub mod stats;

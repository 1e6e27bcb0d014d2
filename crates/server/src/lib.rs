pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod factory;
pub mod media;
pub mod telemetry;
pub mod tls;

pub mod config;
pub mod connection;
pub mod telemetry;

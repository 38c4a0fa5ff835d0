//! flowkeeper library exports

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod routes;
pub mod services;
pub mod state;
pub mod syslog;
pub mod tasks;

//! Core domain + application logic for the panel Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and SQLite live
//! behind ports (traits) implemented in adapter crates.

pub mod archive;
pub mod backup;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod router;
pub mod scheduler;
pub mod security;
pub mod session;
pub mod settings;

pub use errors::{Error, Result};

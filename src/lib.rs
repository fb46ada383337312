//! Lead intake service library.
//!
//! Accepts lead and review submissions from the site, validates and stores
//! them, and fans accepted leads out to notification sinks (Telegram,
//! automation webhook) on a bounded background executor.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection and schema setup.
//! - `db_storage`: PostgreSQL storage backend.
//! - `dispatcher`: Best-effort notification fan-out.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `i18n`: Site locales and validation messages.
//! - `lead_validator`: Lead form validation.
//! - `models`: Core data models.
//! - `notification_models`: Notification payloads and wire bodies.
//! - `phone`: Phone normalization and formatting.
//! - `review_validator`: Review form validation.
//! - `routes`: Router assembly.
//! - `store`: Storage traits, in-memory backend and catalog cache.
//! - `telegram_client`: Telegram Bot API sink.
//! - `webhook_client`: Generic webhook sink.

pub mod config;
pub mod db;
pub mod db_storage;
pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod i18n;
pub mod lead_validator;
pub mod models;
pub mod notification_models;
pub mod phone;
pub mod review_validator;
pub mod routes;
pub mod store;
pub mod telegram_client;
pub mod webhook_client;

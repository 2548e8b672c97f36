//! Leadscout
//!
//! Searches RapidAPI job and local-business listings with locally stored
//! credential profiles, exports results to CSV and relays selected records to
//! a Clay.com webhook one row per request.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `credential_models`: API key profiles, quota summary.
//! - `credential_store`: Key-value backed profile storage.
//! - `job_models`: JSearch parameters and job display records.
//! - `business_models`: Local Business Data parameters and display records.
//! - `services`: RapidAPI search clients.
//! - `pagination`: Result paging.
//! - `csv_export`: CSV serialization.
//! - `webhook_models`: Relay payloads and outcome summaries.
//! - `webhook_relay`: Sequential per-record webhook relay.
//! - `handlers`: HTTP request handlers.

pub mod business_models;
pub mod config;
pub mod credential_models;
pub mod credential_store;
pub mod csv_export;
pub mod errors;
pub mod handlers;
pub mod job_models;
pub mod pagination;
pub mod services;
pub mod webhook_models;
pub mod webhook_relay;

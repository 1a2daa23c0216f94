//! Portfolio Advisor API Library
//!
//! Watches the client intake table, derives a risk profile and asset
//! allocation for every new client, and stores the result as an analysis row.
//! The same derivation is served on demand over HTTP.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core derivation logic.
//! - `integrations`: Client data store backends.
//! - `allocation`: Four-sleeve asset allocation.
//! - `circuit_breaker`: Circuit breaker around store reads.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `goals`: Goal payload normalization.
//! - `handlers`: HTTP request handlers and OpenAPI document.
//! - `market_data`: Static market listings embedded in every analysis.
//! - `metrics`: Cash-flow metrics.
//! - `models`: Intake, derived and persisted data models.
//! - `pg_store`: Postgres client data store.
//! - `poller`: Background intake poller.
//! - `risk`: Risk tolerance and capacity.
//! - `store`: The `ClientStore` trait.
//! - `supabase_client`: Supabase REST client data store.
//! - `synthesis`: Assembly of the analysis document.
//! - `watermark`: Creation-time cursor over the intake table.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod allocation;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod goals;
pub mod handlers;
pub mod market_data;
pub mod metrics;
pub mod models;
pub mod pg_store;
pub mod poller;
pub mod risk;
pub mod store;
pub mod supabase_client;
pub mod synthesis;
pub mod watermark;

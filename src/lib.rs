//! Astrolabe - Astrological chart computation MCP Server
//!
//! Computes natal and derived charts on the Swiss Ephemeris, matches aspects,
//! detects aspect patterns, locates events in time and runs batches of charts
//! concurrently behind a content-addressed result cache.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod events;
pub mod models;
pub mod server;
pub mod service;

pub use error::ChartError;
pub use server::AstrolabeServer;
pub use service::ChartService;

//! Gluon Census Prometheus Exporter
//!
//! Counts the firmware versions of Freifunk/Gluon nodes across mesh
//! communities and exposes the counts in Prometheus format.
//!
//! # Overview
//!
//! Every community publishes node metadata through one or more map endpoints
//! (`meshviewer.json`, `nodes.json`) in one of several JSON formats. The
//! exporter fetches all endpoints, normalizes the nodes into one record shape,
//! merges nodes a community lists more than once and counts them per version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      HTTP(S)     ┌────────────────────────────────┐
//! │ Community   │ ───────────────► │ fetch ─► detect ─► formats     │
//! │ endpoints   │   raw JSON       │            │                   │
//! └─────────────┘                  │            ▼                   │      ┌────────────┐
//!                                  │ normalize ─► aggregate ─► metrics ──► │ .prom file │
//!                                  └────────────────────────────────┘      │ or /metrics│
//!                                                                          └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`formats`] - Schema adapters for the known metadata formats
//! - [`detect`] - Format detection with endpoint-specific precedence
//! - [`normalize`] - Version and label normalization
//! - [`aggregate`] - Per-community merge and tally
//! - [`metrics`] - Prometheus exposition
//! - [`pipeline`] - Census orchestration
//! - [`fetch`] - HTTP fetching of endpoint documents
//! - [`sink`] - Atomic output file writes
//! - [`server`] - Long-running HTTP mode
//! - [`probe`] - Endpoint discovery helper
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use gluon_census_exporter::{config::Config, pipeline::Census, sink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     let report = Census::from_config(&config)?.run(&config.communities).await;
//!     sink::write_atomic(&config.census.output, &report.render()?)?;
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod probe;
pub mod server;
pub mod sink;

//! Push-based observability for fusiontrade
//!
//! Metrics are collected in a prometheus registry and pushed outward only:
//! the performance reporter logs them as structured JSON and the binary
//! prints the text exposition on shutdown. Nothing listens for requests.

pub mod metrics;

pub use metrics::Metrics;

//! Zipkin-compatible span collector that tags spans with Kubernetes pod identity

pub mod api;
mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;

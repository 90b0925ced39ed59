//! Span models and the ingest pipeline

pub mod collector;
pub mod decorator;
pub mod spans;

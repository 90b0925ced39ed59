//! Data layer: pod metadata resolution and span storage

pub mod pods;
pub mod storage;

//! Utility modules

pub mod file;
pub mod hex;
pub mod properties;

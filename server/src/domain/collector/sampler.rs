//! Trace-id based sampling
//!
//! A trace is kept when the absolute value of the low 64 bits of its id falls
//! below `rate * i64::MAX`, so every span of a trace gets the same decision
//! on every collector. Debug spans are always kept.

use crate::utils::hex::trace_id_low_bits;

#[derive(Debug, Clone, Copy)]
pub struct CollectorSampler {
    boundary: i64,
}

impl CollectorSampler {
    /// `rate` is clamped to `[0.0, 1.0]`
    pub fn new(rate: f64) -> Self {
        let rate = rate.clamp(0.0, 1.0);
        Self {
            boundary: (rate * i64::MAX as f64) as i64,
        }
    }

    pub fn always() -> Self {
        Self::new(1.0)
    }

    pub fn is_sampled(&self, trace_id: &str, debug: bool) -> bool {
        if debug {
            return true;
        }
        let Some(low) = trace_id_low_bits(trace_id) else {
            tracing::warn!(trace_id, "Invalid trace id, dropping span");
            return false;
        };
        // i64::MIN has no positive counterpart
        let magnitude = if low == i64::MIN { i64::MAX } else { low.abs() };
        magnitude <= self.boundary
    }
}

//! Shared primitives used across the gateway workspace: the cooperative
//! shutdown signal, process-wide logging setup, and the logging macros.

pub mod logging;
mod signal;

pub use signal::Signal;
pub use tracing;

/// Clamps an `i64` into `0..=100`, used by the telemetry battery-percent
/// derivation.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_percent_bounds() {
        assert_eq!(clamp_percent(-10), 0);
        assert_eq!(clamp_percent(150), 100);
        assert_eq!(clamp_percent(50), 50);
    }
}

//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of request rates
//! and latencies.

use std::time::Duration;

/// Calculate operations per second
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use kvbench::util::units::calculate_ops_per_sec;
///
/// let rate = calculate_ops_per_sec(1000, Duration::from_secs(2));
/// assert!((rate - 500.0).abs() < 0.01);
/// ```
pub fn calculate_ops_per_sec(operations: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    operations as f64 / duration.as_secs_f64()
}

/// Format a request rate with appropriate units
///
/// # Examples
/// ```
/// use kvbench::util::units::format_rate;
///
/// assert_eq!(format_rate(1500.0), "1.5K ops/s");
/// assert_eq!(format_rate(42.0), "42 ops/s");
/// ```
pub fn format_rate(ops_per_sec: f64) -> String {
    if ops_per_sec >= 1_000_000.0 {
        format!("{:.1}M ops/s", ops_per_sec / 1_000_000.0)
    } else if ops_per_sec >= 1_000.0 {
        format!("{:.1}K ops/s", ops_per_sec / 1_000.0)
    } else {
        format!("{:.0} ops/s", ops_per_sec)
    }
}

/// Format latency duration with appropriate precision
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use kvbench::util::units::format_latency;
///
/// assert_eq!(format_latency(Duration::from_millis(5)), "5.00ms");
/// assert_eq!(format_latency(Duration::from_micros(500)), "500μs");
/// ```
pub fn format_latency(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if micros >= 1000 {
        format!("{:.2}ms", micros as f64 / 1000.0)
    } else {
        format!("{}μs", micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_ops_per_sec() {
        let rate = calculate_ops_per_sec(1000, Duration::from_secs(1));
        assert!((rate - 1000.0).abs() < 0.01);

        let rate = calculate_ops_per_sec(500, Duration::from_millis(500));
        assert!((rate - 1000.0).abs() < 0.01);

        assert_eq!(calculate_ops_per_sec(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0 ops/s");
        assert_eq!(format_rate(500.0), "500 ops/s");
        assert_eq!(format_rate(1500.0), "1.5K ops/s");
        assert_eq!(format_rate(2_500_000.0), "2.5M ops/s");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Duration::from_millis(5)), "5.00ms");
        assert_eq!(format_latency(Duration::from_micros(500)), "500μs");
        assert_eq!(format_latency(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_latency(Duration::from_millis(2500)), "2.50s");
    }
}

//! Shared text formatting for command output

use std::time::Duration;

use tickstats::{DurationSummary, TPS};

/// TPS rounded to two places, capped at the target with a `*` marker above it
pub fn format_tps(tps: f64) -> String {
    let target = TPS as f64;
    if tps > target {
        format!("*{target:.2}")
    } else {
        format!("{tps:.2}")
    }
}

/// `min/median/95th percentile/max` in milliseconds
pub fn format_durations(summary: &DurationSummary) -> String {
    format!(
        "{:.1}/{:.1}/{:.1}/{:.1}",
        summary.min, summary.median, summary.percentile95, summary.max
    )
}

/// A `[0, 1]` load as a percentage
pub fn format_load(load: f64) -> String {
    format!("{:.2}%", load * 100.0)
}

/// Largest-unit-first, at most three parts: `1d 4h 2m`, `3m 20s`, `0s`
pub fn format_duration(duration: Duration) -> String {
    let mut remaining = duration.as_secs();
    let units = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

    let parts: Vec<String> = units
        .iter()
        .filter_map(|(suffix, size)| {
            let amount = remaining / size;
            remaining %= size;
            (amount > 0).then(|| format!("{amount}{suffix}"))
        })
        .take(3)
        .collect();

    if parts.is_empty() { "0s".to_string() } else { parts.join(" ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tps() {
        assert_eq!(format_tps(19.876), "19.88");
        assert_eq!(format_tps(20.0), "20.00");
        assert_eq!(format_tps(20.4), "*20.00");
    }

    #[test]
    fn test_format_durations() {
        let summary = DurationSummary {
            min: 1.0,
            median: 2.24,
            mean: 3.0,
            percentile95: 10.04,
            max: 55.54,
        };
        assert_eq!(format_durations(&summary), "1.0/2.2/10.0/55.5");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(200)), "3m 20s");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2h");
    }

    #[test]
    fn test_format_load() {
        assert_eq!(format_load(0.1234), "12.34%");
    }
}

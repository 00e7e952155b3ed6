// Wall-clock source for save timestamps.
//
// The only non-deterministic input the engine accepts is the time written to
// `meta.created_at_iso` / `meta.updated_at_iso`. It is injected through the
// `Clock` trait so tests can pin it with `FixedClock`, and it never feeds any
// simulation formula.

use chrono::{DateTime, SecondsFormat, Utc};

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_unix_ms(&self) -> u64;

    fn now_iso(&self) -> String {
        format_iso8601(self.now_unix_ms())
    }
}

/// Reads the operating system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix_ms(&self) -> u64 {
        self.0
    }
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ` (UTC). Instants
/// outside chrono's range format as the epoch.
pub fn format_iso8601(unix_ms: u64) -> String {
    let instant = i64::try_from(unix_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default();
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch() {
        assert_eq!(format_iso8601(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn formats_known_instants() {
        assert_eq!(format_iso8601(1_700_000_000_000), "2023-11-14T22:13:20.000Z");
        // Leap day with every component non-zero.
        assert_eq!(format_iso8601(951_782_400_000 + 3_723_004), "2000-02-29T01:02:03.004Z");
    }

    #[test]
    fn out_of_range_formats_as_epoch() {
        assert_eq!(format_iso8601(u64::MAX), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_unix_ms() > 1_577_836_800_000);
        assert!(SystemClock.now_iso().ends_with('Z'));
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = FixedClock(1_700_000_000_000);
        assert_eq!(clock.now_iso(), clock.now_iso());
        assert_eq!(clock.now_unix_ms(), 1_700_000_000_000);
    }
}

//! Wall-clock time in the panel's timezone.

use std::time::Duration;

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Cadence of the on-screen clock.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);

/// Local time source. The UTC offset is resolved once at startup and
/// the handle is copied around freely afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: UtcOffset,
}

impl Clock {
    /// Resolves the local offset. Must run before the runtime spawns
    /// threads, the platform lookup refuses multithreaded processes.
    /// Falls back to the configured offset, then UTC.
    pub fn detect(fallback_hours: Option<i8>) -> Self {
        let offset = UtcOffset::current_local_offset()
            .ok()
            .or_else(|| fallback_hours.and_then(|hours| UtcOffset::from_hms(hours, 0, 0).ok()))
            .unwrap_or(UtcOffset::UTC);
        Self { offset }
    }

    pub fn fixed(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        PrimitiveDateTime::new(now.date(), now.time())
    }

    /// Now with sub-minute parts zeroed, for minute-level change
    /// detection.
    pub fn minute(&self) -> PrimitiveDateTime {
        let now = self.now();
        now.replace_second(0)
            .and_then(|now| now.replace_nanosecond(0))
            .unwrap_or(now)
    }

    /// Log timestamp, "2026-08-24 at 07:05".
    pub fn stamp(&self) -> String {
        let now = self.now();
        format!(
            "{:04}-{:02}-{:02} at {:02}:{:02}",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_zeroes_sub_minute_parts() {
        let clock = Clock::fixed(UtcOffset::UTC);
        let minute = clock.minute();
        assert_eq!(minute.second(), 0);
        assert_eq!(minute.nanosecond(), 0);
    }

    #[test]
    fn offsets_shift_the_reading() {
        let utc = Clock::fixed(UtcOffset::UTC);
        let ahead = Clock::fixed(UtcOffset::from_hms(2, 0, 0).unwrap());
        let diff = ahead.now() - utc.now() - time::Duration::hours(2);
        assert!(diff.whole_seconds().abs() <= 1);
    }

    #[test]
    fn stamp_is_date_at_minute() {
        let stamp = Clock::fixed(UtcOffset::UTC).stamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[10..14], " at ");
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[16..17], ":");
    }
}

//! Human-relative durations for viewing room open/close windows
//!
//! Phrasing comes from an immutable [`RelativeTimeLocale`] table handed to
//! [`humanize`]; there is no global locale registry.

use chrono::{DateTime, Duration, Utc};

/// Phrasing table; `%d` is replaced by the count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTimeLocale {
    pub second: &'static str,
    pub seconds: &'static str,
    pub minute: &'static str,
    pub minutes: &'static str,
    pub hour: &'static str,
    pub hours: &'static str,
    pub day: &'static str,
    pub days: &'static str,
    pub month: &'static str,
    pub months: &'static str,
    pub year: &'static str,
    pub years: &'static str,
}

/// Full words: `"3 days"`
pub const LONG: RelativeTimeLocale = RelativeTimeLocale {
    second: "%d second",
    seconds: "%d seconds",
    minute: "%d minute",
    minutes: "%d minutes",
    hour: "%d hour",
    hours: "%d hours",
    day: "%d day",
    days: "%d days",
    month: "%d month",
    months: "%d months",
    year: "%d year",
    years: "%d years",
};

/// Count and unit only: `"3d"`
pub const SHORT: RelativeTimeLocale = RelativeTimeLocale {
    second: "%ds",
    seconds: "%ds",
    minute: "%dm",
    minutes: "%dm",
    hour: "%dh",
    hours: "%dh",
    day: "%dd",
    days: "%dd",
    month: "%dmo",
    months: "%dmo",
    year: "%dy",
    years: "%dy",
};

/// Upper bounds of each unit before rolling over to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub single_second: i64,
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub days: i64,
    pub months: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            single_second: 1,
            seconds: 45,
            minutes: 45,
            hours: 22,
            days: 31,
            months: 11,
        }
    }
}

const LONG_OPEN_WINDOW_DAYS: i64 = 30;
const LONG_CLOSE_WINDOW_DAYS: i64 = 10;
const SHORT_CLOSE_WINDOW_DAYS: i64 = 5;

/// Phrase a duration with the default thresholds
pub fn humanize(duration: Duration, locale: &RelativeTimeLocale) -> String {
    humanize_with(duration, locale, &Thresholds::default())
}

/// Phrase a duration, rounding each unit half-up. Sub-second durations are
/// reported as one second rather than zero.
pub fn humanize_with(
    duration: Duration,
    locale: &RelativeTimeLocale,
    thresholds: &Thresholds,
) -> String {
    let millis = duration.num_milliseconds().unsigned_abs() as f64;
    let days_exact = millis / 86_400_000.0;
    let months_exact = days_exact * 4800.0 / 146_097.0;

    let seconds = round(millis / 1000.0);
    let minutes = round(millis / 60_000.0);
    let hours = round(millis / 3_600_000.0);
    let days = round(days_exact);
    let months = round(months_exact);
    let years = round(months_exact / 12.0);

    let (template, count) = if seconds <= thresholds.single_second {
        (locale.second, seconds.max(1))
    } else if seconds < thresholds.seconds {
        (locale.seconds, seconds)
    } else if minutes <= 1 {
        (locale.minute, 1)
    } else if minutes < thresholds.minutes {
        (locale.minutes, minutes)
    } else if hours <= 1 {
        (locale.hour, 1)
    } else if hours < thresholds.hours {
        (locale.hours, hours)
    } else if days <= 1 {
        (locale.day, 1)
    } else if days < thresholds.days {
        (locale.days, days)
    } else if months <= 1 {
        (locale.month, 1)
    } else if months < thresholds.months {
        (locale.months, months)
    } else if years <= 1 {
        (locale.year, 1)
    } else {
        (locale.years, years)
    };

    template.replacen("%d", &count.to_string(), 1)
}

fn round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Time until a viewing room opens.
///
/// `None` once it has opened. The long form also stays `None` until the
/// opening is at most 30 days away; the short form has no upper bound.
pub fn distance_to_open(start_at: DateTime<Utc>, now: DateTime<Utc>, short: bool) -> Option<String> {
    if start_at < now {
        return None;
    }
    if !short && start_at > now + Duration::days(LONG_OPEN_WINDOW_DAYS) {
        return None;
    }

    let locale = if short { &SHORT } else { &LONG };
    Some(humanize(start_at - now, locale))
}

/// Time until an open viewing room closes.
///
/// `None` unless the room is open, and unless closing is at most 10 days
/// (long form) or 5 days (short form) away. Always phrased in full words.
pub fn distance_to_close(
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    now: DateTime<Utc>,
    short: bool,
) -> Option<String> {
    if start_at > now || end_at < now {
        return None;
    }

    let window = if short {
        SHORT_CLOSE_WINDOW_DAYS
    } else {
        LONG_CLOSE_WINDOW_DAYS
    };
    if end_at > now + Duration::days(window) {
        return None;
    }

    Some(humanize(end_at - now, &LONG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_humanize_long() {
        assert_eq!(humanize(Duration::milliseconds(300), &LONG), "1 second");
        assert_eq!(humanize(Duration::seconds(0), &LONG), "1 second");
        assert_eq!(humanize(Duration::seconds(30), &LONG), "30 seconds");
        assert_eq!(humanize(Duration::seconds(50), &LONG), "1 minute");
        assert_eq!(humanize(Duration::minutes(10), &LONG), "10 minutes");
        assert_eq!(humanize(Duration::minutes(50), &LONG), "1 hour");
        assert_eq!(humanize(Duration::hours(5), &LONG), "5 hours");
        assert_eq!(humanize(Duration::hours(23), &LONG), "1 day");
        assert_eq!(humanize(Duration::days(4), &LONG), "4 days");
        assert_eq!(humanize(Duration::days(30), &LONG), "30 days");
        assert_eq!(humanize(Duration::days(40), &LONG), "1 month");
        assert_eq!(humanize(Duration::days(100), &LONG), "3 months");
        assert_eq!(humanize(Duration::days(400), &LONG), "1 year");
        assert_eq!(humanize(Duration::days(800), &LONG), "2 years");
    }

    #[test]
    fn test_humanize_short_has_no_words() {
        assert_eq!(humanize(Duration::days(4), &SHORT), "4d");
        assert_eq!(humanize(Duration::hours(5), &SHORT), "5h");
        assert_eq!(humanize(Duration::days(40), &SHORT), "1mo");
        assert_eq!(humanize(Duration::milliseconds(10), &SHORT), "1s");
    }

    #[test]
    fn test_distance_to_open_windows() {
        let far = now() + Duration::days(40);
        assert_eq!(distance_to_open(far, now(), false), None);
        assert_eq!(distance_to_open(far, now(), true).as_deref(), Some("1mo"));

        let soon = now() + Duration::days(3);
        assert_eq!(distance_to_open(soon, now(), false).as_deref(), Some("3 days"));
        assert_eq!(distance_to_open(soon, now(), true).as_deref(), Some("3d"));

        let edge = now() + Duration::days(30);
        assert_eq!(distance_to_open(edge, now(), false).as_deref(), Some("30 days"));
    }

    #[test]
    fn test_distance_to_open_after_opening() {
        let past = now() - Duration::hours(1);
        assert_eq!(distance_to_open(past, now(), false), None);
        assert_eq!(distance_to_open(past, now(), true), None);
    }

    #[test]
    fn test_distance_to_close_windows() {
        let start = now() - Duration::days(2);

        let end = now() + Duration::days(11);
        assert_eq!(distance_to_close(start, end, now(), false), None);

        let end = now() + Duration::days(4);
        assert_eq!(
            distance_to_close(start, end, now(), false).as_deref(),
            Some("4 days")
        );
        assert_eq!(
            distance_to_close(start, end, now(), true).as_deref(),
            Some("4 days")
        );

        let end = now() + Duration::days(7);
        assert_eq!(
            distance_to_close(start, end, now(), false).as_deref(),
            Some("7 days")
        );
        assert_eq!(distance_to_close(start, end, now(), true), None);
    }

    #[test]
    fn test_distance_to_close_outside_open_period() {
        let future_start = now() + Duration::days(1);
        let end = now() + Duration::days(3);
        assert_eq!(distance_to_close(future_start, end, now(), false), None);

        let start = now() - Duration::days(10);
        let ended = now() - Duration::days(1);
        assert_eq!(distance_to_close(start, ended, now(), false), None);
    }
}

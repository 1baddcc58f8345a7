use crate::message::{MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE};

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Human readable duration used in emails, e.g. "1 day 2 hours". Seconds are dropped.
pub fn format_duration(millis: i64) -> String {
    if millis < MILLIS_PER_MINUTE {
        return "less than a minute".into();
    }

    let days = millis / MILLIS_PER_DAY;
    let hours = (millis % MILLIS_PER_DAY) / MILLIS_PER_HOUR;
    let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;

    [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| pluralize(*count, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

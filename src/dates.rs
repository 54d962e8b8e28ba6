//! Day-granularity date helpers.
//!
//! Due dates are plain calendar dates. "Today" is always passed in by the
//! caller so every rule here is deterministic under test.

use chrono::{Datelike, Duration, NaiveDate};

/// Last day of the ISO week (Monday to Sunday) containing `today`.
///
/// Equivalent to `today + (7 - iso_weekday)` with Monday = 1 and Sunday = 7,
/// so on a Sunday the week ends today.
pub fn end_of_week(today: NaiveDate) -> NaiveDate {
    let weekday = today.weekday().number_from_monday() as i64;
    today + Duration::days(7 - weekday)
}

/// `YYYY-MM-DD`, or an empty string when there is no date.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {}d", delta)
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - weekday names ("fri", "friday", "next monday"), resolved forward from today
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(end_of_week(today)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let (next, name) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };
    if let Some(target) = weekday_index(name) {
        let current = today.weekday().num_days_from_monday() as i64;
        let mut ahead = (target + 7 - current) % 7;
        if next {
            ahead += 7;
        }
        return Some(today + Duration::days(ahead));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn weekday_index(name: &str) -> Option<i64> {
    let idx = match name {
        "monday" | "mon" => 0,
        "tuesday" | "tue" => 1,
        "wednesday" | "wed" => 2,
        "thursday" | "thu" => 3,
        "friday" | "fri" => 4,
        "saturday" | "sat" => 5,
        "sunday" | "sun" => 6,
        _ => return None,
    };
    Some(idx)
}

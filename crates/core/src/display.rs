//! Human-readable timestamp formatting for API responses.

use chrono::{Datelike, Timelike};

use crate::types::Timestamp;

/// Format a timestamp as `"March 3rd 2024, 4:05:09 pm"`.
pub fn format_display_date(ts: Timestamp) -> String {
    let (is_pm, hour) = ts.hour12();
    format!(
        "{} {}{} {}, {}:{:02}:{:02} {}",
        ts.format("%B"),
        ts.day(),
        ordinal_suffix(ts.day()),
        ts.year(),
        hour,
        ts.minute(),
        ts.second(),
        if is_pm { "pm" } else { "am" },
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn formats_afternoon() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 3, 16, 5, 9).unwrap();
        assert_eq!(format_display_date(ts), "March 3rd 2024, 4:05:09 pm");
    }

    #[test]
    fn formats_midnight_as_twelve_am() {
        let ts = Utc.with_ymd_and_hms(2022, 11, 21, 0, 0, 0).unwrap();
        assert_eq!(format_display_date(ts), "November 21st 2022, 12:00:00 am");
    }

    #[test]
    fn teens_use_th() {
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }
}

//! Server-side date stamps, formatted the way browsers in an en-US locale
//! print them (`toLocaleDateString` and friends).

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};

/// `3/9/2026`
pub fn release_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%-m/%-d/%Y").to_string()
}

/// `3/9/2026, 4:05:09 PM`
pub fn timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// `4:05:09 PM`
pub fn time_of_day<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%-I:%M:%S %p").to_string()
}

pub fn now() -> DateTime<Local> {
    Local::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_match_en_us() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 16, 5, 9).unwrap();
        assert_eq!(release_date(&at), "3/9/2026");
        assert_eq!(timestamp(&at), "3/9/2026, 4:05:09 PM");
        assert_eq!(time_of_day(&at), "4:05:09 PM");
    }

    #[test]
    fn midnight_is_twelve_am() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 1).unwrap();
        assert_eq!(time_of_day(&at), "12:00:01 AM");
        assert_eq!(release_date(&at), "12/31/2026");
    }
}

use chrono::{Duration, Months, NaiveDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap() - Duration::days(1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap() - Duration::days(1)
    }
}

/// Lowercase three-letter abbreviation for a month number (1-12).
pub fn month_abbrev(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTH_ABBREVIATIONS[month as usize - 1]),
        _ => None,
    }
}

/// `date` minus `months` calendar months, clamped to the end of shorter months
/// (Aug 31 minus 6 months is Feb 28/29).
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2025, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        assert_eq!(
            last_day_of_month(2025, 2),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        ); // Leap year
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_month_abbrev() {
        assert_eq!(month_abbrev(1), Some("jan"));
        assert_eq!(month_abbrev(9), Some("sep"));
        assert_eq!(month_abbrev(12), Some("dec"));
        assert_eq!(month_abbrev(0), None);
        assert_eq!(month_abbrev(13), None);
    }

    #[test]
    fn test_months_before_clamps() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        assert_eq!(
            months_before(d, 6),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        let d = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(
            months_before(d, 6),
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
        );
    }
}

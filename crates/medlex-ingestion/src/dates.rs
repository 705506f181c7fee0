//! Calendar date resolution for citation date elements.

use chrono::NaiveDate;

/// Three-letter month code to the two-digit form used by journal
/// publication dates.
pub fn month_number(month: &str) -> Option<&'static str> {
    match month {
        "Jan" => Some("01"),
        "Feb" => Some("02"),
        "Mar" => Some("03"),
        "Apr" => Some("04"),
        "May" => Some("05"),
        "Jun" => Some("06"),
        "Jul" => Some("07"),
        "Aug" => Some("08"),
        "Sep" => Some("09"),
        "Oct" => Some("10"),
        "Nov" => Some("11"),
        "Dec" => Some("12"),
        _ => None,
    }
}

/// Resolve a (year, month, day) text triple into a calendar date.
///
/// The month is parsed numerically first, then looked up in the
/// three-letter code table. Any failure yields `None`; an unresolvable
/// date is never fatal to the citation.
pub fn resolve_date(
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Option<NaiveDate> {
    let year: i32 = year?.trim().parse().ok()?;
    let month_raw = month?.trim();
    let month: u32 = month_raw
        .parse()
        .ok()
        .or_else(|| month_number(month_raw).and_then(|m| m.parse().ok()))?;
    let day: u32 = day?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_numeric_triple() {
        let d = resolve_date(Some("2014"), Some("7"), Some("21")).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2014, 7, 21).unwrap());
    }

    #[test]
    fn resolves_three_letter_month_code() {
        let d = resolve_date(Some("1998"), Some("Dec"), Some("3")).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(1998, 12, 3).unwrap());
    }

    #[test]
    fn unresolvable_triple_is_none() {
        assert!(resolve_date(Some("1998"), Some("Winter"), Some("3")).is_none());
        assert!(resolve_date(None, Some("Dec"), Some("3")).is_none());
        assert!(resolve_date(Some("1998"), Some("2"), Some("31")).is_none());
    }
}

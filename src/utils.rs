//! Useful functions for reading GEDCOM values.

use crate::Date;

/// Parses an exact GEDCOM date such as `01 JAN 1900` into a [`Date`](crate::Date).
///
/// Qualified, ranged or partial dates (`ABT 1900`, `BET 1900 AND 1910`,
/// `JAN 1900`) yield `None`.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse_from_str(value.trim(), "%d %b %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_dates() {
        assert_eq!(parse_date("01 JAN 1900"), Date::from_ymd_opt(1900, 1, 1));
        assert_eq!(parse_date(" 25 dec 1850 "), Date::from_ymd_opt(1850, 12, 25));
    }

    #[test]
    fn rejects_partial_dates() {
        for value in ["ABT 1900", "JAN 1900", "1900", "BET 1900 AND 1910", "", "31 FEB 1900"] {
            assert_eq!(parse_date(value), None, "{}", value);
        }
    }
}

//! Human-readable size and age strings.

use std::time::Duration;

use crate::error::{Error, Result};

const KIB: i64 = 1024;

/// Parse a size such as `"100MB"`, `"10kb"` or `"512"` into bytes.
///
/// Suffixes are matched case-insensitively and are powers of 1024. A bare
/// number is a byte count. Fractions and combined units are rejected.
pub fn parse_size(input: &str) -> Result<i64> {
    let invalid = || Error::InvalidSize {
        input: input.to_string(),
    };

    let normalized = input.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(digits) = normalized.strip_suffix("KB") {
        (digits, KIB)
    } else if let Some(digits) = normalized.strip_suffix("MB") {
        (digits, KIB * KIB)
    } else if let Some(digits) = normalized.strip_suffix("GB") {
        (digits, KIB * KIB * KIB)
    } else {
        (normalized.as_str(), 1)
    };

    let value: i64 = digits.parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// Parse an age such as `"30m"` or `"2d"`.
///
/// Exactly one non-negative integer followed by one of `s`, `m`, `h`, `d`.
/// Forms like `"1h30m"` or `"1.5h"` fail instead of being truncated.
pub fn parse_age(input: &str) -> Result<Duration> {
    let invalid = |reason| Error::InvalidAge {
        input: input.to_string(),
        reason,
    };

    if input.len() < 2 {
        return Err(invalid("expected <number><unit>"));
    }

    let unit_secs: u64 = match input.as_bytes()[input.len() - 1] {
        b's' => 1,
        b'm' => 60,
        b'h' => 60 * 60,
        b'd' => 24 * 60 * 60,
        _ => return Err(invalid("unit must be one of s, m, h, d")),
    };

    // The unit byte is ASCII, so this slice lands on a char boundary.
    let value = &input[..input.len() - 1];
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("value must be a non-negative integer"));
    }

    let value: u64 = value
        .parse()
        .map_err(|_| invalid("value must be a non-negative integer"))?;
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid("value is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_size_table() {
        let cases: &[(&str, Option<i64>)] = &[
            ("10KB", Some(10 * 1024)),
            ("20MB", Some(20 * 1024 * 1024)),
            ("5GB", Some(5 * 1024 * 1024 * 1024)),
            ("100", Some(100)),
            ("15kb", Some(15 * 1024)),
            ("2mb", Some(2 * 1024 * 1024)),
            ("1gb", Some(1024 * 1024 * 1024)),
            ("  1MB  ", Some(1024 * 1024)),
            ("", None),
            ("   ", None),
            ("MB", None),
            ("10XB", None),
            ("abc", None),
            ("1.5MB", None),
            ("1GB512MB", None),
            ("9999999999GB", None),
        ];

        for (input, expected) in cases {
            let got = parse_size(input).ok();
            assert_eq!(got, *expected, "parse_size({input:?})");
        }
    }

    #[test]
    fn test_parse_size_error_variant() {
        let err = parse_size("abc").unwrap_err();
        assert!(matches!(err, Error::InvalidSize { .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_parse_age_table() {
        let cases: &[(&str, Option<Duration>)] = &[
            ("1d", Some(Duration::from_secs(24 * 3600))),
            ("1h", Some(Duration::from_secs(3600))),
            ("30m", Some(Duration::from_secs(30 * 60))),
            ("15s", Some(Duration::from_secs(15))),
            ("2h", Some(Duration::from_secs(2 * 3600))),
            ("0m", Some(Duration::ZERO)),
            ("invalid", None),
            ("10x", None),
            ("", None),
            ("h", None),
            ("-5m", None),
            ("+5m", None),
            ("1h30m", None),
            ("1.5h", None),
            ("5", None),
            ("10é", None),
        ];

        for (input, expected) in cases {
            let got = parse_age(input).ok();
            assert_eq!(got, *expected, "parse_age({input:?})");
        }
    }

    #[test]
    fn test_parse_age_error_variant() {
        let err = parse_age("10x").unwrap_err();
        assert!(matches!(err, Error::InvalidAge { .. }));
    }

    proptest! {
        #[test]
        fn size_suffixes_scale_by_1024(n in 0i64..1_000_000) {
            prop_assert_eq!(parse_size(&format!("{n}")).unwrap(), n);
            prop_assert_eq!(parse_size(&format!("{n}KB")).unwrap(), n * 1024);
            prop_assert_eq!(parse_size(&format!("{n}MB")).unwrap(), n * 1024 * 1024);
            prop_assert_eq!(parse_size(&format!("{n}GB")).unwrap(), n * 1024 * 1024 * 1024);
        }

        #[test]
        fn size_suffix_is_case_insensitive(n in 0i64..1_000_000, suffix in "[kKmMgG][bB]") {
            let upper = format!("{n}{}", suffix.to_ascii_uppercase());
            prop_assert_eq!(parse_size(&format!("{n}{suffix}")).unwrap(), parse_size(&upper).unwrap());
        }

        #[test]
        fn age_units_are_exact(n in 0u64..1_000_000) {
            prop_assert_eq!(parse_age(&format!("{n}s")).unwrap(), Duration::from_secs(n));
            prop_assert_eq!(parse_age(&format!("{n}m")).unwrap(), Duration::from_secs(n * 60));
            prop_assert_eq!(parse_age(&format!("{n}h")).unwrap(), Duration::from_secs(n * 3600));
            prop_assert_eq!(parse_age(&format!("{n}d")).unwrap(), Duration::from_secs(n * 86400));
        }

        #[test]
        fn negative_and_fractional_ages_fail(n in 1u64..1_000, frac in 1u64..10, unit in "[smhd]") {
            let negative = format!("-{n}{unit}");
            let fractional = format!("{n}.{frac}{unit}");
            let unitless = n.to_string();
            prop_assert!(parse_age(&negative).is_err());
            prop_assert!(parse_age(&fractional).is_err());
            prop_assert!(parse_age(&unitless).is_err());
        }
    }
}

//! Exact decimal seconds for durations and timestamps
//!
//! `seconds + nanos / 1e9` is kept as a [`BigDecimal`] with scale 9 so that
//! `60.000000001s` is strictly greater than `60s`.

use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use harness_core::rules::TimeSpec;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

fn total_nanos(seconds: i64, nanos: i32) -> i128 {
    i128::from(seconds) * NANOS_PER_SECOND + i128::from(nanos)
}

/// Decimal seconds of a seconds/nanos pair
pub fn decimal_seconds(seconds: i64, nanos: i32) -> BigDecimal {
    BigDecimal::new(BigInt::from(total_nanos(seconds, nanos)), 9)
}

/// Decimal seconds of a rule literal
pub fn spec_seconds(spec: &TimeSpec) -> BigDecimal {
    decimal_seconds(spec.seconds, spec.nanos)
}

/// Current wall clock time as decimal seconds since the epoch
pub fn now() -> BigDecimal {
    let now = chrono::Utc::now();
    decimal_seconds(now.timestamp(), now.timestamp_subsec_nanos() as i32)
}

/// Render a duration the way it is written in configuration: `60s`, `1.5s`
pub fn format_duration(spec: &TimeSpec) -> String {
    let total = total_nanos(spec.seconds, spec.nanos);
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let whole = total / NANOS_PER_SECOND as u128;
    let fraction = total % NANOS_PER_SECOND as u128;
    if fraction == 0 {
        format!("{}{}s", sign, whole)
    } else {
        let digits = format!("{:09}", fraction);
        format!("{}{}.{}s", sign, whole, digits.trim_end_matches('0'))
    }
}

/// Render a timestamp as RFC 3339
pub fn format_timestamp(spec: &TimeSpec) -> String {
    match chrono::DateTime::from_timestamp(spec.seconds, spec.nanos.max(0) as u32) {
        Some(ts) => ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
        None => format!("{}.{:09}", spec.seconds, spec.nanos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(60, 0, "60s")]
    #[case(60, 1, "60.000000001s")]
    #[case(1, 500_000_000, "1.5s")]
    #[case(-1, -250_000_000, "-1.25s")]
    #[case(0, 0, "0s")]
    fn test_format_duration(#[case] seconds: i64, #[case] nanos: i32, #[case] expected: &str) {
        assert_eq!(format_duration(&TimeSpec::new(seconds, nanos)), expected);
    }

    #[test]
    fn test_decimal_precision() {
        let limit = decimal_seconds(60, 0);
        assert!(decimal_seconds(60, 0) <= limit);
        assert!(decimal_seconds(60, 1) > limit);
        assert!(decimal_seconds(59, 999_999_999) < limit);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&TimeSpec::new(1000, 0)), "1970-01-01T00:16:40Z");
    }
}

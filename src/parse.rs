//! Field parsers: unsigned integer, unsigned fixed-point float, and
//! borrowed string, all operating on raw byte slices with no heap traffic.

/// Parses an unsigned base-10 integer from `digits`. An empty slice yields
/// `0`.
///
/// # Panics
///
/// Panics on any non-digit byte — a non-digit where a digit is expected is
/// a schema error that aborts the run.
pub fn parse_u32(digits: &[u8]) -> u32 {
    let mut n: u32 = 0;
    for &b in digits {
        schema_assert(b.is_ascii_digit(), "non-digit byte in integer field");
        n = n.wrapping_mul(10).wrapping_add((b - b'0') as u32);
    }
    n
}

/// Parses an unsigned fixed-point decimal with at most one `.` into an
/// `f32`, locale-independently.
///
/// # Panics
///
/// Panics on a second `.` or a non-digit byte (schema error).
pub fn parse_ufloat(digits: &[u8]) -> f32 {
    let mut int_part: u64 = 0;
    let mut frac_part: u64 = 0;
    let mut frac_len: u32 = 0;
    let mut seen_dot = false;

    for &b in digits {
        if b == b'.' {
            schema_assert(!seen_dot, "two decimal points in float field");
            seen_dot = true;
            continue;
        }
        schema_assert(b.is_ascii_digit(), "non-digit byte in float field");
        let d = (b - b'0') as u64;
        if seen_dot {
            frac_part = frac_part * 10 + d;
            frac_len += 1;
        } else {
            int_part = int_part * 10 + d;
        }
    }

    let frac = if frac_len == 0 {
        0.0
    } else {
        frac_part as f64 / 10f64.powi(frac_len as i32)
    };
    (int_part as f64 + frac) as f32
}

/// Borrows `bytes` as a `&str`, assuming the CSV is valid UTF-8 — fields
/// never contain `;` or `\n` by contract, so the byte range handed in here
/// is exactly one field's content.
///
/// # Panics
///
/// Panics if the bytes aren't valid UTF-8 (schema error).
pub fn parse_str(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or_else(|_| schema_error("field is not valid UTF-8"))
}

fn schema_assert(cond: bool, msg: &str) {
    if !cond {
        schema_error(msg);
    }
}

fn schema_error(msg: &str) -> ! {
    panic!("schema error: {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers() {
        assert_eq!(parse_u32(b"0"), 0);
        assert_eq!(parse_u32(b"42"), 42);
        assert_eq!(parse_u32(b"1000000"), 1_000_000);
    }

    #[test]
    fn empty_integer_is_zero() {
        assert_eq!(parse_u32(b""), 0);
    }

    #[test]
    #[should_panic(expected = "schema error")]
    fn rejects_non_digit_integer() {
        let _ = parse_u32(b"12a");
    }

    #[test]
    fn parses_plain_and_fractional_floats() {
        assert_eq!(parse_ufloat(b"10"), 10.0);
        assert!((parse_ufloat(b"10.5") - 10.5).abs() < 1e-6);
        assert!((parse_ufloat(b"0.125") - 0.125).abs() < 1e-6);
        assert!((parse_ufloat(b"6.666667") - 6.666667).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "schema error")]
    fn rejects_two_decimal_points() {
        let _ = parse_ufloat(b"1.2.3");
    }

    #[test]
    fn borrows_string_without_copying() {
        let bytes = b"driver name";
        assert_eq!(parse_str(bytes), "driver name");
    }

    proptest::proptest! {
        #[test]
        fn parse_u32_round_trips_formatted_values(n in 0u32..10_000_000) {
            let s = n.to_string();
            proptest::prop_assert_eq!(parse_u32(s.as_bytes()), n);
        }

        #[test]
        fn parse_ufloat_is_within_one_ulp_of_source(
            int_part in 0u32..1_000_000,
            frac in 0u32..1_000_000,
        ) {
            let s = format!("{int_part}.{frac:06}");
            let expected: f32 = s.parse().unwrap();
            let got = parse_ufloat(s.as_bytes());
            proptest::prop_assert!((got - expected).abs() <= expected.abs() * 1e-5 + 1e-6);
        }
    }
}

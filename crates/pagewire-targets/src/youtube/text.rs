//! Parsing of YouTube's human-readable counters and durations.

/// `"1,234,567 views"` to `1234567`. Anything unparsable is zero.
pub fn parse_view_count(text: &str) -> u64 {
    text.replace(',', "")
        .split_whitespace()
        .next()
        .and_then(|number| number.parse().ok())
        .unwrap_or(0)
}

/// `"h:mm:ss"`, `"m:ss"`, or `"s"` to seconds. Unparsable parts count as zero,
/// and a total that does not fit in `u64` is zero.
pub fn parse_duration_secs(text: &str) -> u64 {
    let parts: Vec<u64> = text
        .trim()
        .split(':')
        .map(|part| part.parse().unwrap_or(0))
        .collect();

    let total = match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)
            .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(*s)),
        [m, s] => m.checked_mul(60).and_then(|m| m.checked_add(*s)),
        [s] => Some(*s),
        _ => None,
    };
    total.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_view_count() {
        assert_eq!(parse_view_count("1,234,567 views"), 1_234_567);
        assert_eq!(parse_view_count("87 views"), 87);
        assert_eq!(parse_view_count("No views"), 0);
        assert_eq!(parse_view_count(""), 0);
        assert_eq!(parse_view_count("   "), 0);
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("1:02:03"), 3723);
        assert_eq!(parse_duration_secs("12:34"), 754);
        assert_eq!(parse_duration_secs("59"), 59);
        assert_eq!(parse_duration_secs(""), 0);
        assert_eq!(parse_duration_secs("LIVE"), 0);
        assert_eq!(parse_duration_secs("1:2:3:4"), 0);
    }

    #[test]
    fn test_parse_duration_secs_out_of_range() {
        assert_eq!(parse_duration_secs("9999999999999999999:00:00"), 0);
        assert_eq!(parse_duration_secs("18446744073709551615:00"), 0);
        assert_eq!(parse_duration_secs("18446744073709551615"), u64::MAX);
    }
}

//! Grafana time-range parsing
//!
//! the SimpleJSON datasource sends `from`/`to` in a handful of string forms:
//! a full RFC-3339 instant, the literal "now", or a relative "now-<N>h".
//! parse failure is deliberately silent: callers treat `None` as "no bound"
//! and fall back to an unfiltered (limit-capped) query.

use chrono::{DateTime, Duration, Utc};

/// parse one range bound. first matching form wins:
/// absent/empty, RFC-3339 (`Z` ≡ `+00:00`), `"now"`, `now-<N>h`, else `None`.
pub fn parse(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    if raw == "now" {
        return Some(Utc::now());
    }

    if let Some(hours) = raw.strip_prefix("now-").and_then(|r| r.strip_suffix('h')) {
        if let Ok(n) = hours.parse::<u32>() {
            return Some(Utc::now() - Duration::hours(i64::from(n)));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn close_to(actual: DateTime<Utc>, expected: DateTime<Utc>) -> bool {
        (actual - expected).num_seconds().abs() < 1
    }

    #[test]
    fn test_absent_and_empty_are_none() {
        assert_eq!(parse(None), None);
        assert_eq!(parse(Some("")), None);
        assert_eq!(parse(Some("   ")), None);
    }

    #[test]
    fn test_rfc3339_exact() {
        let parsed = parse(Some("2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_offset_equivalent_to_z() {
        let z = parse(Some("2024-01-01T06:00:00Z")).unwrap();
        let offset = parse(Some("2024-01-01T06:00:00+00:00")).unwrap();
        assert_eq!(z, offset);
    }

    #[test]
    fn test_rfc3339_with_millis() {
        let parsed = parse(Some("2024-01-01T00:00:00.500Z")).unwrap();
        assert_eq!(parsed.timestamp_millis(), 1_704_067_200_500);
    }

    #[test]
    fn test_now() {
        let parsed = parse(Some("now")).unwrap();
        assert!(close_to(parsed, Utc::now()));
    }

    #[test]
    fn test_now_minus_hours() {
        let parsed = parse(Some("now-6h")).unwrap();
        assert!(close_to(parsed, Utc::now() - Duration::hours(6)));
    }

    #[test]
    fn test_now_minus_zero_hours() {
        let parsed = parse(Some("now-0h")).unwrap();
        assert!(close_to(parsed, Utc::now()));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse(Some("garbage")), None);
        assert_eq!(parse(Some("now-xh")), None);
        assert_eq!(parse(Some("now-6d")), None);
        assert_eq!(parse(Some("now--6h")), None);
        assert_eq!(parse(Some("2024-13-99")), None);
    }
}

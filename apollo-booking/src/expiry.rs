use chrono::{DateTime, FixedOffset, NaiveDateTime, SubsecRound, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised hold expiry timestamp: {0}")]
pub struct ExpiryParseError(pub String);

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse the `expires` field of a hold response.
///
/// Accepts `2025-03-15 18:02:00`, `2025-03-15T18:02:00.123456`, with or
/// without `Z`, `+01:00` or `+0100`. Fractions are cut to milliseconds and a
/// timestamp without a zone is taken as UTC.
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, ExpiryParseError> {
    let trimmed = raw.trim();
    let normalized = match trimmed.as_bytes().get(10) {
        Some(b' ') | Some(b't') => format!("{}T{}", &trimmed[..10], trimmed[11..].trim_start()),
        _ => trimmed.to_string(),
    };

    let parsed = DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .or_else(|| parse_zoned(&normalized))
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_naive(&normalized).map(|naive| naive.and_utc()));

    parsed
        .map(|dt| dt.trunc_subsecs(3))
        .ok_or_else(|| ExpiryParseError(raw.to_string()))
}

fn parse_zoned(s: &str) -> Option<DateTime<FixedOffset>> {
    ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Token lifetime expressions
///
/// Lifetimes are configured as compact strings such as `"15m"` or `"30d"`.
///
/// # Grammar
///
/// ```text
/// expr := digits unit?
/// unit := "s" | "m" | "h" | "d"
/// ```
///
/// A bare integer is a number of seconds. Leading and trailing whitespace is
/// ignored. Anything else is rejected with [`ExpiryParseError`]; callers decide
/// what a rejected expression means (see [`resolve_refresh_ttl`]).
///
/// # Example
///
/// ```
/// use projecthub_shared::auth::expiry::parse_expiry;
/// use chrono::Duration;
///
/// assert_eq!(parse_expiry("15m").unwrap(), Duration::minutes(15));
/// assert_eq!(parse_expiry("90").unwrap(), Duration::seconds(90));
/// assert!(parse_expiry("soon").is_err());
/// ```

use chrono::Duration;

/// Lifetime used for refresh tokens when the configured expression is unusable
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;

/// Longest accepted lifetime; keeps `now + ttl` representable
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

/// Error type for lifetime expressions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryParseError {
    /// Expression was empty or whitespace
    #[error("Expiry expression is empty")]
    Empty,

    /// Numeric part is missing or not a non-negative integer
    #[error("Invalid expiry amount in '{0}'")]
    InvalidAmount(String),

    /// Unit suffix is not one of s, m, h, d
    #[error("Unknown expiry unit '{unit}' in '{expr}'")]
    UnknownUnit { expr: String, unit: String },

    /// Amount exceeds [`MAX_EXPIRY_DAYS`]
    #[error("Expiry '{0}' is out of range")]
    OutOfRange(String),
}

/// Parses a lifetime expression into a duration
pub fn parse_expiry(expr: &str) -> Result<Duration, ExpiryParseError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(ExpiryParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(ExpiryParseError::InvalidAmount(trimmed.to_string()));
    }

    let amount: i64 = digits
        .parse()
        .map_err(|_| ExpiryParseError::OutOfRange(trimmed.to_string()))?;

    let seconds_per_unit: i64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => {
            return Err(ExpiryParseError::UnknownUnit {
                expr: trimmed.to_string(),
                unit: other.to_string(),
            })
        }
    };

    amount
        .checked_mul(seconds_per_unit)
        .filter(|seconds| *seconds <= MAX_EXPIRY_DAYS * 24 * 60 * 60)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ExpiryParseError::OutOfRange(trimmed.to_string()))
}

/// Resolves the refresh-token lifetime with the 30-day fallback policy
///
/// An unparseable expression does not abort startup; it resolves to
/// [`DEFAULT_REFRESH_TTL_DAYS`] and logs a warning. The resolved value is used
/// both for the signed `exp` claim and for the stored `expires_at`, so the two
/// always agree.
pub fn resolve_refresh_ttl(expr: &str) -> Duration {
    match parse_expiry(expr) {
        Ok(ttl) => ttl,
        Err(e) => {
            tracing::warn!(
                expr = %expr,
                error = %e,
                fallback_days = DEFAULT_REFRESH_TTL_DAYS,
                "Unparseable refresh token lifetime, applying default policy"
            );
            Duration::days(DEFAULT_REFRESH_TTL_DAYS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_expiry("45s").unwrap(), Duration::seconds(45));
        assert_eq!(parse_expiry("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_expiry("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_expiry("30d").unwrap(), Duration::days(30));
    }

    #[test]
    fn test_bare_integer_is_seconds() {
        assert_eq!(parse_expiry("900").unwrap(), Duration::seconds(900));
        assert_eq!(parse_expiry(" 60 ").unwrap(), Duration::seconds(60));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_expiry(""), Err(ExpiryParseError::Empty));
        assert_eq!(parse_expiry("   "), Err(ExpiryParseError::Empty));
        assert!(matches!(
            parse_expiry("m"),
            Err(ExpiryParseError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_expiry("-5m"),
            Err(ExpiryParseError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_expiry("2w"),
            Err(ExpiryParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_expiry("10 m"),
            Err(ExpiryParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_expiry("1.5h"),
            Err(ExpiryParseError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            parse_expiry("99999999999999999999d"),
            Err(ExpiryParseError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_expiry("9223372036854775807d"),
            Err(ExpiryParseError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_expiry("1000000000d"),
            Err(ExpiryParseError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_expiry("36501d"),
            Err(ExpiryParseError::OutOfRange(_))
        ));
        assert_eq!(parse_expiry("36500d").unwrap(), Duration::days(MAX_EXPIRY_DAYS));
    }

    #[test]
    fn test_refresh_fallback_is_deterministic() {
        assert_eq!(resolve_refresh_ttl("7d"), Duration::days(7));
        assert_eq!(resolve_refresh_ttl("forever"), Duration::days(30));
        assert_eq!(resolve_refresh_ttl(""), Duration::days(30));
        assert_eq!(resolve_refresh_ttl("1000000000d"), Duration::days(30));
    }
}

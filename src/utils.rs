//! Utility functions for the ranking service

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC timestamp at microsecond precision, matching what the
/// database stores.
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Trim a client supplied session id, treating blank values as absent.
pub fn normalize_session_id(session_id: Option<String>) -> Option<String> {
    session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_timestamp_has_microsecond_precision() {
        let now = current_timestamp();
        assert_eq!(now.nanosecond() % 1_000, 0);
    }

    #[test]
    fn test_normalize_session_id() {
        assert_eq!(normalize_session_id(None), None);
        assert_eq!(normalize_session_id(Some("   ".into())), None);
        assert_eq!(
            normalize_session_id(Some(" abc ".into())),
            Some("abc".to_string())
        );
    }
}

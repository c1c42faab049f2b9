//! ISO-8601 codec for temporal fields inside persisted aggregates.
//!
//! Every date embedded in a persisted record is written as an RFC 3339 string
//! and revived to a [`Timestamp`] on load. A value that cannot be revived
//! degrades to `None` instead of failing the whole record.
//!
//! Use on `Option<Timestamp>` fields:
//!
//! ```ignore
//! #[serde(default, with = "crate::temporal::lenient")]
//! pub joined_at: Option<Timestamp>,
//! ```

use crate::Timestamp;
use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp as RFC 3339 with as much sub-second precision as needed.
pub fn format_iso8601(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 string with any offset, normalised to UTC.
pub fn parse_iso8601(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Lenient serde adapter for `Option<Timestamp>`.
pub mod lenient {
    use super::{format_iso8601, parse_iso8601};
    use crate::Timestamp;
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Other(IgnoredAny),
    }

    pub fn serialize<S>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&format_iso8601(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
        Ok(match raw {
            Some(RawTimestamp::Text(text)) => parse_iso8601(&text),
            Some(RawTimestamp::Other(_)) | None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, with = "lenient")]
        at: Option<Timestamp>,
    }

    #[test]
    fn test_round_trip_preserves_instant() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let json = serde_json::to_string(&Stamped { at: Some(ts) }).unwrap();
        assert!(json.contains("2023-11-14T22:13:20.123456789Z"));
        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, Some(ts));
    }

    #[test]
    fn test_offset_is_normalised() {
        let parsed = parse_iso8601("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_unparseable_degrades_to_none() {
        let back: Stamped = serde_json::from_str(r#"{"at":"not a date"}"#).unwrap();
        assert_eq!(back.at, None);
        let back: Stamped = serde_json::from_str(r#"{"at":12345}"#).unwrap();
        assert_eq!(back.at, None);
    }

    #[test]
    fn test_missing_and_null_are_none() {
        let back: Stamped = serde_json::from_str("{}").unwrap();
        assert_eq!(back.at, None);
        let back: Stamped = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert_eq!(back.at, None);
    }

    #[test]
    fn test_javascript_style_millis_accepted() {
        let parsed = parse_iso8601("2024-01-15T09:30:00.000Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap());
    }
}

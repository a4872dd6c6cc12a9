use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::navigation::Route;

/// Durable proof of a successful login. Stored as
/// `{"name", "loginTime", "authenticated": true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(rename = "name", alias = "userName")]
    pub user_name: String,
    pub login_time: DateTime<Utc>,
    pub authenticated: bool,
}

impl SessionRecord {
    pub fn new(user_name: impl Into<String>, login_time: DateTime<Utc>) -> Self {
        Self {
            user_name: user_name.into(),
            login_time,
            authenticated: true,
        }
    }

    /// Parses a stored record. Anything unreadable, unauthenticated or
    /// nameless counts as no record.
    pub fn parse(raw: &str) -> Option<Self> {
        let record: SessionRecord = serde_json::from_str(raw).ok()?;
        if !record.authenticated || record.user_name.trim().is_empty() {
            return None;
        }
        Some(record)
    }
}

/// Session passed explicitly from a login view to the next screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandoff {
    pub user_name: String,
    pub login_time: DateTime<Utc>,
    pub destination: Route,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_records_written_by_the_browser_client() {
        let raw = r#"{"name":"alice","loginTime":"2024-03-01T09:30:00.000Z","authenticated":true}"#;
        let record = SessionRecord::parse(raw).unwrap();
        assert_eq!(record.user_name, "alice");
        assert_eq!(
            record.login_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn accepts_user_name_alias() {
        let raw = r#"{"userName":"bob","loginTime":"2024-03-01T09:30:00Z","authenticated":true}"#;
        assert_eq!(SessionRecord::parse(raw).unwrap().user_name, "bob");
    }

    #[test]
    fn rejects_unauthenticated_or_partial_records() {
        assert!(SessionRecord::parse(
            r#"{"name":"alice","loginTime":"2024-03-01T09:30:00Z","authenticated":false}"#
        )
        .is_none());
        assert!(SessionRecord::parse(r#"{"name":"alice","authenticated":true}"#).is_none());
        assert!(SessionRecord::parse(r#"{"name":"alice","loginTi"#).is_none());
        assert!(SessionRecord::parse(
            r#"{"name":"  ","loginTime":"2024-03-01T09:30:00Z","authenticated":true}"#
        )
        .is_none());
    }

    #[test]
    fn serializes_with_name_key() {
        let record = SessionRecord::new("carol", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "carol");
        assert_eq!(value["authenticated"], true);
        assert!(value.get("loginTime").is_some());
    }
}

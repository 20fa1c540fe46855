//! Admin session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Back-office session created by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    /// Session ID (token)
    pub id: String,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AdminSession {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// API view of the session
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            expires_at: self.expires_at.timestamp_millis(),
        }
    }
}

/// Session as returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    /// Expiry as Unix epoch milliseconds
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let live = AdminSession {
            id: "a".into(),
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        let dead = AdminSession {
            id: "b".into(),
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::hours(25),
        };
        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }

    #[test]
    fn test_info_uses_epoch_millis() {
        let expires_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let session = AdminSession {
            id: "token".into(),
            expires_at,
            created_at: expires_at,
        };

        let json = serde_json::to_value(session.info()).unwrap();
        assert_eq!(json["sessionId"], "token");
        assert_eq!(json["expiresAt"], 1_700_000_000_123_i64);
    }
}

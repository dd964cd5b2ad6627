//! Actor metadata attached to stored revisions

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Opaque actor metadata recorded at persistence time.
///
/// Attached by the persistence layer: creation info on a record's first
/// revision, last-change info on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    /// Unix timestamp (seconds) of the action
    pub timestamp: i64,
}

impl UserInfo {
    /// Actor info stamped with the current time.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            firstname: None,
            lastname: None,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Set first and last name.
    pub fn with_name(mut self, firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        self.firstname = Some(firstname.into());
        self.lastname = Some(lastname.into());
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stamps_current_time() {
        let info = UserInfo::new("editor");
        assert_eq!(info.username, "editor");
        assert!(info.timestamp > 0);
    }

    #[test]
    fn test_with_name() {
        let info = UserInfo::new("jdoe").with_name("Jane", "Doe").at(100);
        assert_eq!(info.firstname.as_deref(), Some("Jane"));
        assert_eq!(info.lastname.as_deref(), Some("Doe"));
        assert_eq!(info.timestamp, 100);
    }
}

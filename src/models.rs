// Data models for the DriveHub API
// Wire payloads, the user profile snapshot and the persisted session

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ApiError;

// ==================================================================================================
// Roles
// ==================================================================================================

/// User role as defined by the DriveHub backend.
///
/// Roles arrive as lowercase strings on the wire, but historical clients have
/// stored capitalized variants, so parsing is case-insensitive everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(ApiError::Validation(format!("unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==================================================================================================
// Wire payloads
// ==================================================================================================

/// OAuth2 token response returned by `/auth/login` and `/auth/refresh`.
///
/// The refresh endpoint returns `refresh_token: null` unless the server
/// decided to rotate it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// Generic `{"message": ...}` acknowledgement body.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Profile snapshot returned by `GET /users/me` and cached in the session
/// store. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_is_active() -> bool {
    true
}

// ==================================================================================================
// Session
// ==================================================================================================

/// The persisted session, assembled from the three stored fields.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_role_parse_lowercase() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("instructor".parse::<Role>().unwrap(), Role::Instructor);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
    }

    #[test]
    fn test_role_parse_mixed_case_and_whitespace() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("INSTRUCTOR".parse::<Role>().unwrap(), Role::Instructor);
        assert_eq!("  Manager ".parse::<Role>().unwrap(), Role::Manager);
    }

    #[test]
    fn test_role_parse_unknown() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, r#""admin""#);
    }

    #[test]
    fn test_role_deserialize_any_case() {
        let role: Role = serde_json::from_str(r#""STUDENT""#).unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_token_pair_with_rotation() {
        let body = r#"{"access_token": "at-1", "refresh_token": "rt-1", "token_type": "bearer"}"#;
        let pair: TokenPair = serde_json::from_str(body).unwrap();
        assert_eq!(pair.access_token, "at-1");
        assert_eq!(pair.refresh_token.as_deref(), Some("rt-1"));
    }

    #[test]
    fn test_token_pair_without_rotation() {
        // The refresh endpoint omits the refresh token unless it rotated.
        let body = r#"{"access_token": "at-2", "refresh_token": null, "token_type": "bearer"}"#;
        let pair: TokenPair = serde_json::from_str(body).unwrap();
        assert_eq!(pair.access_token, "at-2");
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_user_summary_from_server_payload() {
        let body = r#"{
            "id": "4a6ef6ff-6f52-45aa-9a3a-2a9e8478c086",
            "email": "admin@drivehub.test",
            "full_name": "Site Admin",
            "role": "admin",
            "is_active": true,
            "created_at": "2026-01-05T09:30:00Z",
            "updated_at": "2026-02-11T15:45:00Z"
        }"#;
        let user: UserSummary = serde_json::from_str(body).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email.as_deref(), Some("admin@drivehub.test"));
        assert!(user.is_active);
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_user_summary_minimal_cached_copy() {
        // Older cached profiles may lack optional fields.
        let body = r#"{"id": "4a6ef6ff-6f52-45aa-9a3a-2a9e8478c086", "role": "Instructor"}"#;
        let user: UserSummary = serde_json::from_str(body).unwrap();
        assert_eq!(user.role, Role::Instructor);
        assert!(user.email.is_none());
        assert!(user.is_active);
    }

    #[test]
    fn test_user_summary_round_trips_through_cache() {
        let body = r#"{"id": "4a6ef6ff-6f52-45aa-9a3a-2a9e8478c086", "role": "manager", "is_active": false}"#;
        let user: UserSummary = serde_json::from_str(body).unwrap();
        let cached = serde_json::to_string(&user).unwrap();
        let back: UserSummary = serde_json::from_str(&cached).unwrap();
        assert_eq!(user, back);
        assert!(!back.is_active);
    }

    proptest! {
        #[test]
        fn role_parse_ignores_case(
            idx in 0usize..4,
            flips in proptest::collection::vec(any::<bool>(), 10),
        ) {
            let names = ["admin", "manager", "instructor", "student"];
            let cased: String = names[idx]
                .chars()
                .zip(flips.iter().cycle())
                .map(|(c, flip)| if *flip { c.to_ascii_uppercase() } else { c })
                .collect();
            let parsed: Role = cased.parse().unwrap();
            prop_assert_eq!(parsed.as_str(), names[idx]);
        }
    }
}

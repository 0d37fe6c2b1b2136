use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The signed-in user as reported by `GET /users/me`.
///
/// Fields the client does not model (aggregate totals and the like) are
/// kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CurrentUser {
    /// Look up a passthrough field as a number, e.g. `total_contributions`.
    pub fn extra_f64(&self, field: &str) -> Option<f64> {
        self.extra.get(field).and_then(Value::as_f64)
    }

    pub fn display_name(&self) -> String {
        match self.email {
            Some(ref email) if !email.is_empty() => format!("{} <{}>", self.username, email),
            _ => self.username.clone(),
        }
    }
}

/// Body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Body for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update for `PUT /users/me`. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_keeps_unknown_fields() {
        let json = r#"{"id": 1, "username": "a", "email": "a@b.com", "created_at": "2024-05-01T10:00:00", "total_contributions": 1500.5}"#;
        let user: CurrentUser = serde_json::from_str(json).expect("parse user");

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "a");
        assert_eq!(user.extra_f64("total_contributions"), Some(1500.5));
        assert_eq!(user.display_name(), "a <a@b.com>");

        let back = serde_json::to_value(&user).expect("serialize user");
        assert_eq!(back["total_contributions"], 1500.5);
    }

    #[test]
    fn test_current_user_minimal() {
        let user: CurrentUser =
            serde_json::from_str(r#"{"id": 1, "username": "a"}"#).expect("parse user");
        assert_eq!(user.email, None);
        assert!(user.extra.is_empty());
        assert_eq!(user.display_name(), "a");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            username: Some("newname".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).expect("serialize update");
        assert_eq!(json, serde_json::json!({"username": "newname"}));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}

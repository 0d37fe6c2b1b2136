use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Percentage of the target reached, computed by the server.
    #[serde(default)]
    pub progress: f64,
}

impl Group {
    /// Amount still needed to reach the target, never negative.
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    pub fn is_funded(&self) -> bool {
        self.target_amount > 0.0 && self.current_amount >= self.target_amount
    }

    pub fn is_created_by(&self, user_id: i64) -> bool {
        self.created_by == Some(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// Body for `POST /groups`.
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target_amount: f64,
}

/// Body for `PUT /groups/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
}

impl GroupUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.target_amount.is_none()
    }
}

/// Response of `POST /groups/{id}/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub membership: Membership,
}

/// Acknowledgement bodies such as `{"message": "Group deleted successfully"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "patient" => Some(Role::Patient),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The verified caller of a request, as vouched for by the upstream authorizer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub user_role: Role,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub points: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Barber,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Barber => "barber",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "client" => Some(Role::Client),
            "barber" => Some(Role::Barber),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Identity of the caller, as supplied by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub role: Role,
}

impl Requester {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

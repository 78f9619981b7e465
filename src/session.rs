use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

struct DemoAccount {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    role: Role,
    password: &'static str,
}

// Demo directory only. Passwords are plain strings compared as-is.
const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        id: "s1",
        name: "Alex Johnson",
        email: "alex@example.com",
        role: Role::Student,
        password: "password",
    },
    DemoAccount {
        id: "f1",
        name: "Dr. Smith",
        email: "drsmith@example.com",
        role: Role::Faculty,
        password: "password",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid email or password")]
pub struct InvalidCredentials;

pub fn login(email: &str, password: &str) -> Result<CurrentUser, InvalidCredentials> {
    let account = DEMO_ACCOUNTS
        .iter()
        .find(|a| a.email == email.trim())
        .ok_or(InvalidCredentials)?;
    if account.password != password {
        return Err(InvalidCredentials);
    }
    Ok(CurrentUser {
        id: account.id.to_string(),
        name: account.name.to_string(),
        email: account.email.to_string(),
        role: account.role,
    })
}

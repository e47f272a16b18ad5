//! Fabricated sign-in records. Nothing here authenticates anyone: each
//! function builds a local [`User`] that the caller hands to
//! [`crate::Store::set_user`].

use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::core::user::User;
use crate::util::generate_id;

pub const DEMO_USER_ID: &str = "demo-user";
pub const DEMO_USER_EMAIL: &str = "demo@example.com";
pub const DEMO_USER_NAME: &str = "Demo User";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Github => "Github",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(format!("unknown provider '{other}' (expected google or github)")),
        }
    }
}

pub fn demo_user(now: DateTime<Utc>) -> User {
    User::new(DEMO_USER_ID, DEMO_USER_EMAIL, DEMO_USER_NAME, now)
}

/// Email sign-in. Both email and password must be non-empty; the password is
/// otherwise ignored. Without a display name the email's local part is used.
pub fn sign_in_with_email(
    email: &str,
    password: &str,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Option<User> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    };
    Some(User::new(generate_id(), email, name, now))
}

pub fn sign_in_with_provider(provider: Provider, now: DateTime<Utc>) -> User {
    User::new(
        generate_id(),
        format!("{}@example.com", provider.as_str()),
        format!("{} User", provider.display_name()),
        now,
    )
}

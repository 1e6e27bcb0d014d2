pub mod auth_check;
pub mod delete;
pub mod get;
pub mod health;
pub mod list;
pub mod search;
pub mod send;

use chrono::{DateTime, Utc};

/// Human form of an optional expiration instant.
pub fn availability(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => format!("Available until: {}", at.to_rfc3339()),
        None => "Available forever.".to_owned(),
    }
}

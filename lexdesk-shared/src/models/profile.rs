/// User profile model
///
/// A profile is created server-side when a user signs up and is keyed by the
/// auth user id. LexDesk only ever reads it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
///     email TEXT NOT NULL,
///     full_name TEXT NOT NULL,
///     avatar_url TEXT,
///     phone TEXT,
///     role TEXT NOT NULL DEFAULT 'lawyer',
///     oab_number TEXT,
///     specializations TEXT[],
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile of an authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth user
    pub id: Uuid,

    pub email: String,

    /// Display name
    pub full_name: String,

    pub avatar_url: Option<String>,

    pub phone: Option<String>,

    /// Free-form role within the practice (e.g. "lawyer", "assistant")
    pub role: String,

    /// Bar registration number (OAB)
    pub oab_number: Option<String>,

    pub specializations: Option<Vec<String>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Remote table name
    pub const TABLE: &'static str = "profiles";

    /// Initials for compact displays ("Maria da Silva" -> "MS")
    pub fn initials(&self) -> String {
        let words: Vec<&str> = self.full_name.split_whitespace().collect();
        let picked: Vec<&str> = match words.as_slice() {
            [] => vec![],
            [only] => vec![*only],
            [first, .., last] => vec![*first, *last],
        };

        picked
            .iter()
            .filter_map(|w| w.chars().next())
            .flat_map(|c| c.to_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(name: &str) -> Profile {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "email": "maria@example.com",
            "full_name": name,
            "role": "lawyer",
            "created_at": "2024-03-01T12:00:00Z",
            "updated_at": "2024-03-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_optional_fields_default_to_none() {
        let p = profile("Maria da Silva");
        assert!(p.oab_number.is_none());
        assert!(p.specializations.is_none());
    }

    #[test]
    fn test_initials() {
        assert_eq!(profile("Maria da Silva").initials(), "MS");
        assert_eq!(profile("joão").initials(), "J");
        assert_eq!(profile("   ").initials(), "");
    }
}

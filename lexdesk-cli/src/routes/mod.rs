/// Page and action handlers
///
/// This module contains all handlers organized by page:
///
/// - `auth`: Sign-in, sign-up, sign-out, current user and organizations
/// - `dashboard`: Statistics and recent cases
/// - `cases`: Case list, creation, update and deletion
/// - `clients`: Client list, creation, update and deletion
/// - `placeholder`: Pages that are not built yet
///
/// Handlers return a [`View`] carrying both a text rendering and a JSON
/// payload; the binary prints whichever the user asked for.

pub mod auth;
pub mod cases;
pub mod clients;
pub mod dashboard;
pub mod placeholder;

use chrono::NaiveDate;
use lexdesk_session::AuthSnapshot;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// Rendered output of a command
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub text: String,
    pub json: JsonValue,
}

impl View {
    pub fn new(text: impl Into<String>, json: JsonValue) -> Self {
        View {
            text: text.into(),
            json,
        }
    }

    /// View whose JSON form is the serialized `value`
    pub fn with_data<T: Serialize>(text: impl Into<String>, value: &T) -> Self {
        let json = serde_json::to_value(value).unwrap_or(JsonValue::Null);
        View::new(text, json)
    }

    pub fn render(&self, json: bool) -> String {
        if json {
            serde_json::to_string_pretty(&self.json).unwrap_or_else(|_| self.json.to_string())
        } else {
            self.text.clone()
        }
    }
}

/// Shown while the session is resolving
pub fn loading() -> View {
    View::new("Carregando...", json!({ "status": "loading" }))
}

/// Page header with the user's name and the active organization
pub fn header(snapshot: &AuthSnapshot, title: &str) -> String {
    let name = snapshot
        .profile
        .as_ref()
        .map(|p| p.full_name.clone())
        .or_else(|| snapshot.user.as_ref().and_then(|u| u.email.clone()))
        .unwrap_or_default();

    let organization = snapshot
        .active_membership
        .as_ref()
        .map(|m| m.organization_name())
        .unwrap_or_else(|| "sem organização".to_string());

    format!("LexDesk › {}    {} · {}\n", title, name, organization)
}

/// Formats an amount as Brazilian reais, e.g. `R$ 1.234,50`
pub fn format_brl(value: f64, decimals: bool) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let (mut units, fraction) = (cents / 100, cents % 100);
    if !decimals && fraction >= 50 {
        units += 1;
    }

    let digits = units.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if decimals {
        format!("{}R$ {},{:02}", sign, grouped, fraction)
    } else {
        format!("{}R$ {}", sign, grouped)
    }
}

/// Formats a date as `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Shortens `text` to `max` characters, appending `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

//! In-band error events.
//!
//! The bus reports business and permission failures as ordinary payload
//! elements carrying an `ilsevent` code. Every result must pass through
//! [`classify`] before any field decoding: decoding an event as if it were an
//! entity yields garbage fields instead of an error.

use serde::Serialize;
use serde_json::Value;

use crate::value::integral_f64;

/// Sentinel key whose presence marks a value as an event.
pub const EVENT_CODE_KEY: &str = "ilsevent";

/// Event code the bus uses for an explicit success status.
pub const SUCCESS_CODE: i64 = 0;

/// Text code carried by permission denials.
pub const PERM_FAILURE: &str = "PERM_FAILURE";

/// A classified in-band event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Numeric event code.
    pub code: i64,
    /// Symbolic code, e.g. `PERM_FAILURE`.
    pub text_code: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Permission code a `PERM_FAILURE` refers to.
    pub ilsperm: Option<String>,
    /// Org unit the denied permission was checked at.
    pub ilspermloc: Option<i64>,
    /// Extra data some methods attach to the event.
    pub payload: Option<Value>,
    /// Server timestamp, as sent.
    pub servertime: Option<String>,
}

impl Event {
    /// Classify a single value. Returns `None` for anything that is data.
    ///
    /// A value is an event iff it is an object whose `ilsevent` field holds a
    /// number or a numeric string. Objects with look-alike keys (`textcode`,
    /// `desc`) but no code are data.
    pub fn from_value(value: &Value) -> Option<Event> {
        let obj = value.as_object()?;
        let code = parse_code(obj.get(EVENT_CODE_KEY)?)?;

        Some(Event {
            code,
            text_code: non_empty_str(obj.get("textcode").or_else(|| obj.get("textCode"))),
            description: non_empty_str(obj.get("desc").or_else(|| obj.get("description"))),
            ilsperm: non_empty_str(obj.get("ilsperm")),
            ilspermloc: obj.get("ilspermloc").and_then(parse_code),
            payload: obj.get("payload").filter(|p| !p.is_null()).cloned(),
            servertime: non_empty_str(obj.get("servertime")),
        })
    }

    /// Description, else text code, else `fallback`.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.description
            .as_deref()
            .or(self.text_code.as_deref())
            .unwrap_or(fallback)
    }

    /// True for the explicit `SUCCESS` event (code 0).
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// True if this event is a permission denial.
    pub fn is_permission_failure(&self) -> bool {
        self.text_code.as_deref() == Some(PERM_FAILURE)
    }
}

/// Classify a decoded value as event or data.
pub fn classify(value: &Value) -> Option<Event> {
    Event::from_value(value)
}

/// True iff the value carries the event sentinel field.
pub fn is_event(value: &Value) -> bool {
    classify(value).is_some()
}

/// Error message for a value: description, else text code, else `fallback`.
///
/// Non-event values always produce the fallback, even when they happen to
/// have `desc`-like keys.
pub fn error_message(value: &Value, fallback: &str) -> String {
    match classify(value) {
        Some(event) => event.message_or(fallback).to_string(),
        None => fallback.to_string(),
    }
}

/// Finds the first event in a value, descending into nested lists.
///
/// Batch methods return lists whose elements may individually be events;
/// this gives callers one check for every layer of nesting.
pub fn find_event(value: &Value) -> Option<Event> {
    match value {
        Value::Array(items) => items.iter().find_map(find_event),
        other => classify(other),
    }
}

fn parse_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

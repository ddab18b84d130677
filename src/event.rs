//! Inbound notification events and their outgoing payload form.
//!
//! A [`NotificationEvent`] is an ordered key-value mapping, exactly as the
//! push transport handed it over. Formatting turns it into a JSON object
//! key-for-key and value-for-value, keeping the original key order; no
//! schema is applied to arbitrary keys.

// Rust guideline compliant 2026-02

use serde_json::{Map, Number, Value};

use crate::error::BridgeError;

/// Key the transport sets on every message it delivers.
pub const MESSAGE_ID_KEY: &str = "google.message_id";

/// Synthetic key marking the message category.
pub const MESSAGE_TYPE_KEY: &str = "messageType";

/// Synthetic key marking how the message reached the app.
pub const TAP_KEY: &str = "tap";

/// Outgoing payload handed to the delivery target.
pub type Payload = Map<String, Value>;

/// A primitive value carried by a notification event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    /// Explicit null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value. Non-finite values cannot be formatted.
    Float(f64),
    /// String value.
    Text(String),
}

impl EventValue {
    fn to_json(&self, key: &str) -> Result<Value, BridgeError> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                BridgeError::Formatting(format!("value for '{key}' is not a finite number"))
            })?,
            Self::Text(s) => Value::String(s.clone()),
        })
    }

    fn from_json(key: &str, value: Value) -> Result<Self, BridgeError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(_) | Value::Object(_) => Err(BridgeError::invalid_argument(format!(
                "event value for '{key}' must be a primitive"
            ))),
        }
    }
}

impl From<&str> for EventValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for EventValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for EventValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for EventValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for EventValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// One inbound message as an ordered key-value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationEvent {
    entries: Vec<(String, EventValue)>,
}

impl NotificationEvent {
    /// Create an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`NotificationEvent::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a key. An existing key keeps its position and takes the new value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<EventValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the event has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in original order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Whether this event carries a transport message id.
    pub fn is_transport_message(&self) -> bool {
        self.contains_key(MESSAGE_ID_KEY)
    }

    /// Tag an event that reached the app through a tapped system notification.
    pub fn tag_background_tap(&mut self) {
        self.set(MESSAGE_TYPE_KEY, "notification");
        self.set(TAP_KEY, "background");
    }

    /// Build an event from a JSON object, keeping its key order.
    ///
    /// Nested arrays and objects are rejected.
    pub fn from_json(value: Value) -> Result<Self, BridgeError> {
        let Value::Object(map) = value else {
            return Err(BridgeError::invalid_argument(
                "notification event must be a JSON object",
            ));
        };
        let entries = map
            .into_iter()
            .map(|(k, v)| EventValue::from_json(&k, v).map(|v| (k, v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Format into the outgoing payload.
    pub fn to_payload(&self) -> Result<Payload, BridgeError> {
        let mut payload = Payload::new();
        for (key, value) in &self.entries {
            payload.insert(key.clone(), value.to_json(key)?);
        }
        Ok(payload)
    }
}

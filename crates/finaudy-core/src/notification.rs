// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification payload normalization.
//
// Payloads reach us from two transports. FCM data messages forwarded by the
// Android activity arrive as `{ "data": { "type": .., .. } }`, while web push
// and in-app notifications are flat (`{ "type": .., "category_id": .. }`).
// Both collapse into one `NotificationPayload` here so the router never has
// to look at the shape.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{FinaudyError, Result};

/// Canonical notification, consumed once by the router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPayload {
    /// The `type` tag, if any.
    pub kind: Option<String>,
    /// Click action (`view`, `dismiss`, ..) when the transport reports one.
    pub action: Option<String>,
    /// Every other field, flattened.
    pub fields: Map<String, Value>,
}

impl NotificationPayload {
    /// Build a payload of the given type with no auxiliary fields.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Add an auxiliary field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Normalize either payload shape.
    ///
    /// Top-level keys are collected first, then the keys of a nested `data`
    /// object overlay them. Anything that is not a JSON object yields an
    /// empty payload.
    pub fn normalize(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut fields = Map::new();
        for (name, value) in object {
            if name != "data" {
                fields.insert(name.clone(), value.clone());
            }
        }
        if let Some(Value::Object(data)) = object.get("data") {
            for (name, value) in data {
                fields.insert(name.clone(), value.clone());
            }
        }

        let kind = fields.remove("type").and_then(|v| scalar_to_string(&v));
        let action = fields.remove("action").and_then(|v| scalar_to_string(&v));

        Self {
            kind: kind.filter(|k| !k.is_empty()),
            action: action.filter(|a| !a.is_empty()),
            fields,
        }
    }

    /// Strict parse: malformed JSON is an error.
    pub fn try_from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| FinaudyError::MalformedPayload(e.to_string()))?;
        Ok(Self::normalize(&value))
    }

    /// Lenient parse used on the click path: malformed JSON becomes an empty
    /// payload, which routes to the default view.
    pub fn from_json(raw: &str) -> Self {
        match Self::try_from_json(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "falling back to empty notification payload");
                Self::default()
            }
        }
    }

    /// Read an auxiliary field as a string. Android intent extras and FCM
    /// data values are strings, but web payloads may carry numbers.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(scalar_to_string)
            .filter(|v| !v.is_empty())
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

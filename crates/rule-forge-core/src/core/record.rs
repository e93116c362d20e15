// crates/rule-forge-core/src/core/record.rs
// ============================================================================
// Module: Rule Forge Records
// Description: Immutable flattened records with optional ground-truth labels.
// Purpose: Provide dotted-path access to scalar field values for evaluation.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Record`] is an immutable mapping from dotted field paths to scalar
//! values, plus an opaque identifier and, for training or validation data, a
//! ground-truth approval label. Records are built by flattening nested JSON
//! objects; full schema validation of inbound documents is a collaborator
//! responsibility, not the core's.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::FieldPath;
use crate::core::identifiers::RecordId;

// ============================================================================
// SECTION: Field Values
// ============================================================================

/// Scalar value stored at one record leaf.
///
/// # Invariants
/// - Serializes transparently as the underlying JSON scalar.
/// - Equality is exact: values of different scalar types are never equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag value.
    Flag(bool),
    /// Numeric value (integers widen losslessly into `f64` for dataset-scale magnitudes).
    Number(f64),
    /// Text value (case-sensitive).
    Text(String),
}

impl FieldValue {
    /// Returns the numeric form of the value, if it is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Flag(_) | Self::Text(_) => None,
        }
    }

    /// Returns the text form of the value, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Flag(_) | Self::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => flag.fmt(f),
            Self::Number(number) => number.fmt(f),
            Self::Text(text) => text.fmt(f),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss, reason = "Dataset magnitudes fit f64 exactly.")]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Immutable flattened record with an optional ground-truth label.
///
/// # Invariants
/// - `fields` is never mutated after construction.
/// - `label` is present only for training/validation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque record identifier.
    pub record_id: RecordId,
    /// Flattened leaf values keyed by dotted path.
    pub fields: BTreeMap<FieldPath, FieldValue>,
    /// Ground-truth approval label, when known.
    pub label: Option<bool>,
}

impl Record {
    /// Creates a record from already-flattened fields.
    #[must_use]
    pub const fn new(
        record_id: RecordId,
        fields: BTreeMap<FieldPath, FieldValue>,
        label: Option<bool>,
    ) -> Self {
        Self {
            record_id,
            fields,
            label,
        }
    }

    /// Builds a record by flattening a nested JSON object into dotted paths.
    ///
    /// Non-scalar leaves (arrays, nulls) are skipped; the evaluator only
    /// consumes scalars, and a condition on a skipped path fails closed.
    #[must_use]
    pub fn from_json(record_id: RecordId, document: &Value, label: Option<bool>) -> Self {
        let mut fields = BTreeMap::new();
        flatten_value(&FieldPath::new(""), document, &mut fields);
        Self {
            record_id,
            fields,
            label,
        }
    }

    /// Resolves a dotted path to its scalar value, if present.
    #[must_use]
    pub fn resolve(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.fields.get(path)
    }
}

// ============================================================================
// SECTION: Flattening
// ============================================================================

/// Recursively flattens a JSON value into dotted-path scalar leaves.
fn flatten_value(prefix: &FieldPath, value: &Value, out: &mut BTreeMap<FieldPath, FieldValue>) {
    match value {
        Value::Object(entries) => {
            for (key, nested) in entries {
                flatten_value(&prefix.child(key), nested, out);
            }
        }
        Value::Bool(flag) => {
            out.insert(prefix.clone(), FieldValue::Flag(*flag));
        }
        Value::Number(number) => {
            if let Some(value) = number.as_f64() {
                out.insert(prefix.clone(), FieldValue::Number(value));
            }
        }
        Value::String(text) => {
            out.insert(prefix.clone(), FieldValue::Text(text.clone()));
        }
        Value::Null | Value::Array(_) => {}
    }
}

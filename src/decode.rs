//! Row decoding.
//!
//! Decoding is total: a property that is absent, null or of an unsupported
//! type yields an empty string, which downstream encoding treats as a
//! vocabulary miss.

use crate::source::{Row, Value};

/// Returns the textual representation of the property `name` on `row`.
pub fn decode<R: Row + ?Sized>(row: &R, name: &str) -> String {
    match row.property(name) {
        Some(value) => to_text(&value),
        None => String::new(),
    }
}

fn to_text(value: &Value<'_>) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::I64(v) => itoa::Buffer::new().format(*v).to_owned(),
        Value::U64(v) => itoa::Buffer::new().format(*v).to_owned(),
        // NaN and infinities have no textual form on the source side.
        Value::F64(v) if !v.is_finite() => String::new(),
        Value::F64(v) => dtoa::Buffer::new().format(*v).to_owned(),
        Value::Str(s) => s.to_string(),
    }
}

/// Property values decoded from one row, keyed by property name.
///
/// Scoped to a single row; discarded once the row has been encoded.
#[derive(Debug, Default)]
pub struct DecodedRow {
    values: Vec<(&'static str, String)>,
}

impl DecodedRow {
    /// Decodes each of the named properties from `row`. Duplicate names are
    /// decoded once.
    pub fn decode<'n, R, I>(row: &R, names: I) -> Self
    where
        R: Row + ?Sized,
        I: IntoIterator<Item = &'n &'static str>,
    {
        let mut values: Vec<(&'static str, String)> = Vec::new();
        for &name in names {
            if values.iter().any(|(existing, _)| *existing == name) {
                continue;
            }
            values.push((name, decode(row, name)));
        }
        Self { values }
    }

    /// The decoded value of `name`, empty when it was not decoded.
    pub fn get(&self, name: &str) -> &str {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }

    /// Number of decoded properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no property was decoded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Outbound contract towards the instrumentation data source.
//!
//! A [`Source`] hands out a [`Session`] per collection cycle. The session
//! executes query text and yields owned [`Row`]s. Release is tied to `Drop`:
//! a session is released when it goes out of scope, a row when its loop
//! iteration ends, on every exit path including early error returns.

use std::borrow::Cow;

/// A data source able to open query sessions, e.g. a WMI namespace
/// connection.
pub trait Source {
    /// Session type, released on drop.
    type Session: Session;

    /// Acquire a session for one collection cycle.
    fn acquire_session(&mut self) -> Result<Self::Session, SourceError>;
}

/// A cycle-scoped session executing queries against the data source.
pub trait Session {
    /// Row type yielded by query results.
    type Row: Row;

    /// Iterator over the rows of one query result. Iteration ends when the
    /// source signals there are no more rows.
    type Rows<'a>: Iterator<Item = Self::Row>
    where
        Self: 'a;

    /// Execute the given query text.
    fn execute_query(&mut self, query: &str) -> Result<Self::Rows<'_>, SourceError>;
}

/// A single record returned by a query.
pub trait Row {
    /// Look up a property by name. `None` when the record carries no such
    /// property.
    fn property(&self, name: &str) -> Option<Value<'_>>;
}

/// A typed property value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value<'a> {
    /// Property present but without value.
    Null,
    /// Boolean property.
    Bool(bool),
    /// Signed integer property.
    I64(i64),
    /// Unsigned integer property.
    U64(u64),
    /// Floating point property.
    F64(f64),
    /// String property.
    Str(Cow<'a, str>),
}

impl Value<'_> {
    /// Borrow the value, avoiding a copy of string data.
    pub fn as_borrowed(&self) -> Value<'_> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::I64(v) => Value::I64(*v),
            Value::U64(v) => Value::U64(*v),
            Value::F64(v) => Value::F64(*v),
            Value::Str(s) => Value::Str(Cow::Borrowed(s.as_ref())),
        }
    }
}

impl From<bool> for Value<'static> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value<'static> {
    fn from(v: i32) -> Self {
        Value::I64(v.into())
    }
}

impl From<i64> for Value<'static> {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value<'static> {
    fn from(v: u32) -> Self {
        Value::U64(v.into())
    }
}

impl From<u64> for Value<'static> {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value<'static> {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value<'static> {
    fn from(v: String) -> Self {
        Value::Str(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(Cow::Borrowed(v))
    }
}

/// Failure reported by the data source.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", status_suffix(.code))]
pub struct SourceError {
    message: String,
    code: Option<i32>,
}

impl SourceError {
    /// Creates a new [`SourceError`] without status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Creates a new [`SourceError`] carrying the source's status code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// The diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status code, if the source reported one.
    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

fn status_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (status 0x{:08x})", code),
        None => String::new(),
    }
}

//! Error types surfaced by the collector.
//!
//! Only lifecycle and transport failures are errors. A property that cannot be
//! decoded or a value outside a vocabulary degrade into metric values instead.

use crate::registry::RegistryError;
use crate::source::SourceError;

/// Errors returned by [`ServiceCollector`](crate::collector::ServiceCollector)
/// and [`CollectorState`](crate::collector::CollectorState).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cycle was invoked before a successful init, or after exit.
    #[error("windows_service collector not yet in operational state")]
    NotOperational,

    /// The data source refused to hand out a session.
    #[error("failed to acquire data source session: {0}")]
    Session(#[source] SourceError),

    /// The data source rejected or failed to execute a query.
    #[error("query `{query}` failed: {source}")]
    Query {
        /// The rendered query text.
        query: String,
        /// The underlying source failure.
        #[source]
        source: SourceError,
    },

    /// The registry refused to create a gauge family.
    #[error("failed to create gauge family `{name}`: {source}")]
    Registration {
        /// Name of the family as requested.
        name: String,
        /// The underlying registry failure.
        #[source]
        source: RegistryError,
    },

    /// A query spec declares a different number of label keys than its
    /// target gauge family.
    #[error("query for `{metric}` declares {expected} label keys but its gauge family has {actual}")]
    LabelArity {
        /// Data source class the spec queries.
        metric: String,
        /// Number of label keys on the spec.
        expected: usize,
        /// Label arity of the gauge family.
        actual: usize,
    },

    /// The supplied configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error stems from the data source transport, i.e. session
    /// acquisition or query execution.
    ///
    /// Transport errors abort the current cycle only; the next scheduled cycle
    /// may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Session(_) | Error::Query { .. })
    }
}

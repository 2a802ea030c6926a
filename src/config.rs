//! Collector configuration.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::registry::validate_metric_name;

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "windows";

/// Configuration of the service collector.
///
/// Missing fields take their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace prefixed to every gauge family name.
    pub namespace: String,

    /// Clause constraining which services are queried, e.g.
    /// `StartMode = 'Auto'`.
    pub where_clause: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            where_clause: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.namespace.is_empty() {
            validate_metric_name(&self.namespace).map_err(|_| {
                Error::Config(format!(
                    "namespace '{}' is not a valid metric name prefix",
                    self.namespace
                ))
            })?;
        }

        if let Some(clause) = &self.where_clause {
            if clause.trim().is_empty() {
                return Err(Error::Config("where_clause cannot be blank".to_string()));
            }
        }

        Ok(())
    }
}

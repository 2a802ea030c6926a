//! Outbound contract towards the host metric registry.
//!
//! The collector only ever creates gauge families and sets gauges on them.
//! See [`GaugeRegistry`] for the contract and [`Batch`] for how a cycle stages
//! its observations before publishing them.

use std::sync::atomic::AtomicU64;
use std::time::{SystemTime, UNIX_EPOCH};

use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// A metric registry able to create gauge families and set gauges.
///
/// Setting the same label tuple twice replaces the prior value.
pub trait GaugeRegistry {
    /// Handle to a created gauge family.
    type Handle;

    /// Create a gauge family named `namespace_subsystem_name` whose label
    /// arity is fixed to `label_keys.len()`.
    fn create_gauge_family(
        &mut self,
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<Self::Handle, RegistryError>;

    /// Label arity the family was created with.
    fn label_arity(&self, handle: &Self::Handle) -> usize;

    /// Set the gauge identified by `label_values` within the family.
    fn set_gauge(
        &self,
        handle: &Self::Handle,
        timestamp: Timestamp,
        value: f64,
        label_values: &[String],
    );
}

/// Failure to create a gauge family.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The fully qualified metric name is not a valid OpenMetrics name.
    #[error("invalid metric name `{0}`")]
    InvalidName(String),
    /// A label key is not a valid OpenMetrics label name.
    #[error("invalid label key `{0}`")]
    InvalidLabelKey(String),
    /// A family with the same name already exists.
    #[error("metric `{0}` is already registered")]
    Duplicate(String),
    /// The registry refused the family.
    #[error("metric `{0}` was rejected by the registry")]
    Rejected(String),
}

/// Joins the non-empty name parts with `_`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Checks `name` against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn validate_metric_name(name: &str) -> Result<(), RegistryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}

/// Checks `key` against `[a-zA-Z_][a-zA-Z0-9_]*`, rejecting the reserved `__`
/// prefix.
pub fn validate_label_key(key: &str) -> Result<(), RegistryError> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !key.starts_with("__")
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidLabelKey(key.to_string()))
    }
}

/// Point in time, in nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Captures the current wall clock time.
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)))
            .unwrap_or_default()
    }

    /// Creates a [`Timestamp`] from nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the Unix epoch.
    pub fn as_nanos(&self) -> u64 {
        self.0
    }
}

/// One gauge sample produced by a collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a, H> {
    /// Target gauge family.
    pub metric: &'a H,
    /// Sample value.
    pub value: f64,
    /// Label values, in the family's label key order.
    pub label_values: Vec<String>,
}

/// Observations staged during one collection cycle.
///
/// A [`Batch`] owns the cycle's single [`Timestamp`]; every observation
/// published from it carries that timestamp. Nothing reaches the registry
/// before [`Batch::publish`], so an aborted cycle publishes nothing.
#[derive(Debug)]
pub struct Batch<'a, H> {
    timestamp: Timestamp,
    observations: Vec<Observation<'a, H>>,
}

impl<'a, H> Batch<'a, H> {
    /// Creates an empty [`Batch`] for the cycle captured at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            observations: Vec::new(),
        }
    }

    /// The cycle timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Stage an observation.
    pub fn emit(&mut self, metric: &'a H, value: f64, label_values: Vec<String>) {
        self.observations.push(Observation {
            metric,
            value,
            label_values,
        });
    }

    /// Staged observations, in emission order.
    pub fn observations(&self) -> &[Observation<'a, H>] {
        &self.observations
    }

    /// Number of staged observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Set every staged observation on `registry`, returning how many were
    /// published.
    pub fn publish<R>(self, registry: &R) -> usize
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
    {
        let published = self.observations.len();
        for observation in self.observations {
            registry.set_gauge(
                observation.metric,
                self.timestamp,
                observation.value,
                &observation.label_values,
            );
        }
        published
    }
}

/// Gauge family registered with a [`prometheus_client`] [`Registry`].
#[derive(Debug, Clone)]
pub struct GaugeFamily {
    name: String,
    label_keys: Vec<String>,
    family: Family<Vec<(String, String)>, Gauge<f64, AtomicU64>>,
}

impl GaugeFamily {
    /// The family name as passed to [`Registry::register`]. A prefix set
    /// through [`Registry::sub_registry_with_prefix`] is not part of it, though
    /// it still shows up in the exposition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The label keys, in order.
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// The underlying metric family.
    pub fn family(&self) -> &Family<Vec<(String, String)>, Gauge<f64, AtomicU64>> {
        &self.family
    }

    fn label_set(&self, label_values: &[String]) -> Vec<(String, String)> {
        self.label_keys
            .iter()
            .cloned()
            .zip(label_values.iter().cloned())
            .collect()
    }
}

/// Families are registered on the [`Registry`] (or sub-registry) passed in,
/// which also owns their exposition. OpenMetrics gauges carry no sample
/// timestamp here, so the cycle timestamp is not forwarded.
impl GaugeRegistry for Registry {
    type Handle = GaugeFamily;

    fn create_gauge_family(
        &mut self,
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<GaugeFamily, RegistryError> {
        let name = fq_name(namespace, subsystem, name);
        validate_metric_name(&name)?;
        for key in label_keys {
            validate_label_key(key)?;
        }

        let family = Family::<Vec<(String, String)>, Gauge<f64, AtomicU64>>::default();
        self.register(name.clone(), help, family.clone());

        Ok(GaugeFamily {
            name,
            label_keys: label_keys.iter().map(|key| key.to_string()).collect(),
            family,
        })
    }

    fn label_arity(&self, handle: &GaugeFamily) -> usize {
        handle.label_keys.len()
    }

    fn set_gauge(
        &self,
        handle: &GaugeFamily,
        _timestamp: Timestamp,
        value: f64,
        label_values: &[String],
    ) {
        handle
            .family
            .get_or_create(&handle.label_set(label_values))
            .set(value);
    }
}

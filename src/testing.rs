//! In-memory data source and recording registry.
//!
//! Useful to exercise a collector, or the host wiring around it, without a
//! WMI connection or an exposition endpoint.

use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::{
    fq_name, validate_label_key, validate_metric_name, GaugeRegistry, RegistryError, Timestamp,
};
use crate::source::{Row, Session, Source, SourceError, Value};

/// A row held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    properties: Vec<(String, Value<'static>)>,
}

impl MemoryRow {
    /// Creates a row without properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing a previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value<'static>>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.properties.iter().position(|(key, _)| *key == name) {
            Some(i) => self.properties[i].1 = value,
            None => self.properties.push((name, value)),
        }
        self
    }

    /// A `Win32_Service` record.
    pub fn service(
        name: &str,
        display_name: &str,
        process_id: u32,
        run_as: &str,
        state: &str,
        start_mode: &str,
        status: &str,
    ) -> Self {
        Self::new()
            .with("Name", name.to_string())
            .with("DisplayName", display_name.to_string())
            .with("ProcessID", process_id)
            .with("StartName", run_as.to_string())
            .with("State", state.to_string())
            .with("StartMode", start_mode.to_string())
            .with("Status", status.to_string())
    }
}

impl Row for MemoryRow {
    fn property(&self, name: &str) -> Option<Value<'_>> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_borrowed())
    }
}

#[derive(Debug, Default)]
struct SessionLog {
    opened: AtomicUsize,
    released: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

/// A [`Source`] serving a fixed set of rows for every query.
///
/// Clones share their session and query log.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Arc<Vec<MemoryRow>>,
    acquire_error: Option<SourceError>,
    query_error: Option<SourceError>,
    log: Arc<SessionLog>,
}

impl MemorySource {
    /// Creates a [`MemorySource`] returning `rows`.
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self {
            rows: Arc::new(rows),
            ..Default::default()
        }
    }

    /// Replaces the rows returned by subsequent queries.
    pub fn set_rows(&mut self, rows: Vec<MemoryRow>) {
        self.rows = Arc::new(rows);
    }

    /// Fails every session acquisition with `error`.
    pub fn fail_acquire(mut self, error: SourceError) -> Self {
        self.acquire_error = Some(error);
        self
    }

    /// Fails every query with `error`.
    pub fn fail_query(mut self, error: SourceError) -> Self {
        self.query_error = Some(error);
        self
    }

    /// Number of sessions handed out.
    pub fn sessions_opened(&self) -> usize {
        self.log.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions released.
    pub fn sessions_released(&self) -> usize {
        self.log.released.load(Ordering::SeqCst)
    }

    /// Query texts executed so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.log.queries.lock().clone()
    }
}

impl Source for MemorySource {
    type Session = MemorySession;

    fn acquire_session(&mut self) -> Result<MemorySession, SourceError> {
        if let Some(error) = &self.acquire_error {
            return Err(error.clone());
        }

        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            rows: Arc::clone(&self.rows),
            query_error: self.query_error.clone(),
            log: Arc::clone(&self.log),
        })
    }
}

/// Session handed out by [`MemorySource`]. Counts as released once dropped.
#[derive(Debug)]
pub struct MemorySession {
    rows: Arc<Vec<MemoryRow>>,
    query_error: Option<SourceError>,
    log: Arc<SessionLog>,
}

impl Session for MemorySession {
    type Row = MemoryRow;
    type Rows<'a> = std::iter::Cloned<slice::Iter<'a, MemoryRow>> where Self: 'a;

    fn execute_query(&mut self, query: &str) -> Result<Self::Rows<'_>, SourceError> {
        self.log.queries.lock().push(query.to_string());
        if let Some(error) = &self.query_error {
            return Err(error.clone());
        }

        Ok(self.rows.iter().cloned())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.log.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A gauge family created on a [`RecordingRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFamily {
    /// Fully qualified name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Label keys, in order.
    pub label_keys: Vec<String>,
}

/// A gauge set on a [`RecordingRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedObservation {
    /// Fully qualified family name.
    pub family: String,
    /// Timestamp passed along with the value.
    pub timestamp: Timestamp,
    /// Value set.
    pub value: f64,
    /// Label values, in the family's label key order.
    pub label_values: Vec<String>,
}

/// A [`GaugeRegistry`] recording every family and every set gauge, including
/// timestamps. Handles are indices into [`RecordingRegistry::families`].
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    families: Vec<RecordedFamily>,
    observations: Mutex<Vec<RecordedObservation>>,
    rejected: Vec<String>,
}

impl RecordingRegistry {
    /// Refuses to create the family with the fully qualified name `name`.
    pub fn reject(mut self, name: impl Into<String>) -> Self {
        self.rejected.push(name.into());
        self
    }

    /// Families created so far, in creation order.
    pub fn families(&self) -> &[RecordedFamily] {
        &self.families
    }

    /// Every observation recorded so far, in order.
    pub fn observations(&self) -> Vec<RecordedObservation> {
        self.observations.lock().clone()
    }

    /// Observations recorded for the family `name`.
    pub fn observations_of(&self, name: &str) -> Vec<RecordedObservation> {
        self.observations
            .lock()
            .iter()
            .filter(|o| o.family == name)
            .cloned()
            .collect()
    }

    /// Current value of the gauge `name` with `label_values`, i.e. the last
    /// value set.
    pub fn value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        self.observations
            .lock()
            .iter()
            .rev()
            .find(|o| o.family == name && o.label_values == label_values)
            .map(|o| o.value)
    }

    /// Forgets all recorded observations.
    pub fn clear(&self) {
        self.observations.lock().clear();
    }
}

impl GaugeRegistry for RecordingRegistry {
    type Handle = usize;

    fn create_gauge_family(
        &mut self,
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<usize, RegistryError> {
        let name = fq_name(namespace, subsystem, name);
        validate_metric_name(&name)?;
        for key in label_keys {
            validate_label_key(key)?;
        }
        if self.rejected.contains(&name) {
            return Err(RegistryError::Rejected(name));
        }
        if self.families.iter().any(|family| family.name == name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.families.push(RecordedFamily {
            name,
            help: help.to_string(),
            label_keys: label_keys.iter().map(|key| key.to_string()).collect(),
        });
        Ok(self.families.len() - 1)
    }

    fn label_arity(&self, handle: &usize) -> usize {
        self.families
            .get(*handle)
            .map_or(0, |family| family.label_keys.len())
    }

    fn set_gauge(&self, handle: &usize, timestamp: Timestamp, value: f64, label_values: &[String]) {
        if let Some(family) = self.families.get(*handle) {
            self.observations.lock().push(RecordedObservation {
                family: family.name.clone(),
                timestamp,
                value,
                label_values: label_values.to_vec(),
            });
        }
    }
}

//! Windows service collector: lifecycle and collection cycle.
//!
//! See [`ServiceCollector`] for the host-facing entry points and
//! [`CollectorState`] for the cycle itself.

use prometheus_client::metrics::MetricType;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::decode::DecodedRow;
use crate::encoding::{encode_onehot, HOT};
use crate::error::Error;
use crate::query::{identity, QuerySpec};
use crate::registry::{Batch, GaugeRegistry, Timestamp};
use crate::source::{Row, Session, Source};
use crate::vocabulary::{Vocabulary, START_MODES, STATES, STATUSES};

/// Data source class holding service records.
pub const SERVICE_CLASS: &str = "Win32_Service";

/// Subsystem part of every family name.
pub const SUBSYSTEM: &str = "service";

const NAME: &str = "Name";
const DISPLAY_NAME: &str = "DisplayName";
const PROCESS_ID: &str = "ProcessID";
const START_NAME: &str = "StartName";

const INFO_NAME: &str = "info";
const INFO_HELP: &str = "A metric for Windows Service information";
const INFO_LABEL_KEYS: [&str; 4] = ["name", "display_name", "process_id", "run_as"];
const INFO_PROPERTIES: [&str; 4] = [NAME, DISPLAY_NAME, PROCESS_ID, START_NAME];

const NAME_LABEL_KEY: &str = "name";

/// A categorical service property published as a one-hot gauge family.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFamily {
    /// Property holding the observed value.
    pub property: &'static str,
    /// Family name, without namespace and subsystem.
    pub name: &'static str,
    /// Family help text.
    pub help: &'static str,
    /// Canonical values the property is encoded against.
    pub vocabulary: &'static Vocabulary,
}

/// Categorical families published per service, keyed by service name.
pub const CATEGORY_FAMILIES: [CategoryFamily; 3] = [
    CategoryFamily {
        property: "State",
        name: "state",
        help: "A state of the service",
        vocabulary: &STATES,
    },
    CategoryFamily {
        property: "StartMode",
        name: "start_mode",
        help: "A start mode of the service",
        vocabulary: &START_MODES,
    },
    CategoryFamily {
        property: "Status",
        name: "status",
        help: "A status of the service",
        vocabulary: &STATUSES,
    },
];

#[derive(Debug)]
struct Category<H> {
    family: CategoryFamily,
    metric: H,
}

/// Outcome of a successful collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Timestamp shared by every observation of the cycle.
    pub timestamp: Timestamp,
    /// Rows returned by the data source.
    pub rows: usize,
    /// Observations published to the registry.
    pub observations: usize,
}

/// State owned by an initialized collector: the gauge family handles and the
/// query specs built from them.
///
/// Created by [`CollectorState::init`], consumed by [`CollectorState::exit`].
#[derive(Debug)]
pub struct CollectorState<H> {
    operational: bool,
    specs: Vec<QuerySpec<H>>,
    categories: Vec<Category<H>>,
}

impl<H> CollectorState<H> {
    /// Creates the gauge families on `registry`, builds the query specs and
    /// marks the state operational.
    ///
    /// Any failure aborts init; no state is returned.
    pub fn init<R>(registry: &mut R, config: &Config) -> Result<Self, Error>
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
    {
        config.validate()?;

        let mut state = Self {
            operational: false,
            specs: Vec::with_capacity(1),
            categories: Vec::with_capacity(CATEGORY_FAMILIES.len()),
        };

        let information = create_family(
            registry,
            &config.namespace,
            INFO_NAME,
            INFO_HELP,
            &INFO_LABEL_KEYS,
        )?;

        for family in CATEGORY_FAMILIES {
            let metric = create_family(
                registry,
                &config.namespace,
                family.name,
                family.help,
                &[NAME_LABEL_KEY, family.vocabulary.label()],
            )?;
            state.categories.push(Category { family, metric });
        }

        state.specs.push(
            QuerySpec::build(
                information,
                MetricType::Gauge,
                SERVICE_CLASS,
                None,
                INFO_PROPERTIES.to_vec(),
                identity,
            )
            .with_where_clause(config.where_clause.clone()),
        );

        state.operational = true;
        info!(
            namespace = %config.namespace,
            where_clause = config.where_clause.as_deref().unwrap_or_default(),
            "windows_service collector initialized"
        );

        Ok(state)
    }

    /// Whether cycles may run.
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Query specs executed on every cycle.
    pub fn specs(&self) -> &[QuerySpec<H>] {
        &self.specs
    }

    /// Runs one collection cycle: acquires a session from `source`, executes
    /// every query spec and publishes the resulting observations to
    /// `registry`.
    ///
    /// Observations are only published once every query succeeded; an
    /// aborted cycle publishes nothing. The session is released on every exit
    /// path.
    pub fn run_cycle<R, S>(&self, registry: &R, source: &mut S) -> Result<CycleSummary, Error>
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
        S: Source + ?Sized,
    {
        let result = self.collect(registry, source);
        if let Err(err) = &result {
            error!(error = %err, "windows_service cycle aborted");
        }
        result
    }

    fn collect<R, S>(&self, registry: &R, source: &mut S) -> Result<CycleSummary, Error>
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
        S: Source + ?Sized,
    {
        if !self.operational {
            return Err(Error::NotOperational);
        }

        let mut session = source.acquire_session().map_err(Error::Session)?;
        let mut batch = Batch::new(Timestamp::now());
        let mut rows = 0;

        for spec in &self.specs {
            spec.validate(registry.label_arity(spec.metric()))?;

            let query = spec.query();
            let results = session
                .execute_query(&query)
                .map_err(|source| Error::Query { query, source })?;

            for row in results {
                self.encode_row(spec, &row, &mut batch);
                rows += 1;
            }
        }
        drop(session);

        let timestamp = batch.timestamp();
        let observations = batch.publish(registry);
        debug!(rows, observations, "windows_service cycle complete");

        Ok(CycleSummary {
            timestamp,
            rows,
            observations,
        })
    }

    fn encode_row<'a, W>(&'a self, spec: &'a QuerySpec<H>, row: &W, batch: &mut Batch<'a, H>)
    where
        W: Row + ?Sized,
    {
        let properties = spec
            .label_keys()
            .iter()
            .chain(self.categories.iter().map(|c| &c.family.property));
        let decoded = DecodedRow::decode(row, properties);

        let identity_labels = spec
            .label_keys()
            .iter()
            .map(|key| decoded.get(key).to_string())
            .collect();
        batch.emit(spec.metric(), spec.transform(HOT), identity_labels);

        let name = decoded.get(NAME);
        for category in &self.categories {
            encode_onehot(
                batch,
                &category.metric,
                name,
                decoded.get(category.family.property),
                category.family.vocabulary,
            );
        }
    }

    /// Releases the state. No cycle can run afterwards.
    pub fn exit(mut self) {
        self.operational = false;
        info!("windows_service collector exited");
    }
}

fn create_family<R>(
    registry: &mut R,
    namespace: &str,
    name: &str,
    help: &str,
    label_keys: &[&str],
) -> Result<R::Handle, Error>
where
    R: GaugeRegistry + ?Sized,
{
    registry
        .create_gauge_family(namespace, SUBSYSTEM, name, help, label_keys)
        .map_err(|source| Error::Registration {
            name: name.to_string(),
            source,
        })
}

/// Host-facing collector slot bracketing repeated cycles between
/// [`ServiceCollector::init`] and [`ServiceCollector::exit`].
///
/// Cycles invoked before a successful init, after a failed init or after
/// exit fail with [`Error::NotOperational`] without touching the data source.
/// Callers serialize cycle invocations.
#[derive(Debug)]
pub struct ServiceCollector<H> {
    state: Option<CollectorState<H>>,
}

impl<H> Default for ServiceCollector<H> {
    fn default() -> Self {
        Self { state: None }
    }
}

impl<H> ServiceCollector<H> {
    /// Creates a new, not yet operational [`ServiceCollector`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes the collector. A failed init leaves the collector
    /// non-operational, discarding any previous state.
    pub fn init<R>(&mut self, registry: &mut R, config: &Config) -> Result<(), Error>
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
    {
        self.state = None;
        match CollectorState::init(registry, config) {
            Ok(state) => {
                self.state = Some(state);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "windows_service collector init failed");
                Err(err)
            }
        }
    }

    /// Whether cycles may run.
    pub fn is_operational(&self) -> bool {
        self.state
            .as_ref()
            .map(CollectorState::is_operational)
            .unwrap_or(false)
    }

    /// The state of an initialized collector.
    pub fn state(&self) -> Option<&CollectorState<H>> {
        self.state.as_ref()
    }

    /// Runs one collection cycle. See [`CollectorState::run_cycle`].
    pub fn run_cycle<R, S>(&self, registry: &R, source: &mut S) -> Result<CycleSummary, Error>
    where
        R: GaugeRegistry<Handle = H> + ?Sized,
        S: Source + ?Sized,
    {
        match &self.state {
            Some(state) => state.run_cycle(registry, source),
            None => {
                error!("windows_service collector not yet in operational state");
                Err(Error::NotOperational)
            }
        }
    }

    /// Releases the collector state. Calling it on a collector that is not
    /// initialized does nothing.
    pub fn exit(&mut self) {
        if let Some(state) = self.state.take() {
            state.exit();
        }
    }
}

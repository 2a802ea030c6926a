#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Collection-cycle engine republishing Windows service records as gauge
//! families.
//!
//! On each cycle the collector queries a data source for `Win32_Service`
//! records, decodes their properties and sets:
//!
//! - `windows_service_info{name, display_name, process_id, run_as}`, a presence
//!   record per service with value `1`,
//! - `windows_service_state{name, state}`,
//!   `windows_service_start_mode{name, start_mode}` and
//!   `windows_service_status{name, status}`, one-hot encoded against fixed
//!   vocabularies: the observed value is `1`, every other entry `0`.
//!
//! The data source and the metric registry are collaborators behind the
//! [`source::Source`] and [`registry::GaugeRegistry`] traits.
//! [`prometheus_client::registry::Registry`] implements the latter.
//!
//! # Examples
//!
//! The in-memory source below requires the `test-util` feature.
//!
//! ```
//! # #[cfg(feature = "test-util")]
//! # {
//! use prometheus_client::encoding::text::encode;
//! use prometheus_client::registry::Registry;
//! use windows_service_collector::collector::ServiceCollector;
//! use windows_service_collector::config::Config;
//! use windows_service_collector::testing::{MemoryRow, MemorySource};
//!
//! let mut registry = Registry::default();
//!
//! // Create the gauge families and the service query.
//! let mut collector = ServiceCollector::new();
//! collector.init(&mut registry, &Config::default()).unwrap();
//!
//! // A data source returning a single running service.
//! let mut source = MemorySource::new(vec![MemoryRow::service(
//!     "Spooler",
//!     "Print Spooler",
//!     1234,
//!     "LocalSystem",
//!     "Running",
//!     "Auto",
//!     "OK",
//! )]);
//!
//! // Invoked by the host scheduler, once per tick.
//! let summary = collector.run_cycle(&registry, &mut source).unwrap();
//! assert_eq!(1, summary.rows);
//!
//! let mut buffer = String::new();
//! encode(&mut buffer, &registry).unwrap();
//! assert!(buffer.contains("windows_service_state{name=\"Spooler\",state=\"running\"} 1.0\n"));
//! assert!(buffer.contains("windows_service_state{name=\"Spooler\",state=\"stopped\"} 0.0\n"));
//!
//! collector.exit();
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod decode;
pub mod encoding;
pub mod error;
pub mod query;
pub mod registry;
pub mod source;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod vocabulary;

pub use error::Error;

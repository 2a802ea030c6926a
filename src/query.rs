//! Declarative query specifications.
//!
//! See [`QuerySpec`] for details.

use std::borrow::Cow;

use prometheus_client::metrics::MetricType;

use crate::error::Error;

/// Transform applied to raw numeric property values before they are set on
/// the target metric.
pub type ValueTransform = fn(f64) -> f64;

/// The identity [`ValueTransform`], used by presence-only metrics.
pub fn identity(value: f64) -> f64 {
    value
}

/// Binds a metric family to a data source query, a value transform and a
/// label extraction plan.
///
/// A [`QuerySpec`] is built once at collector init and never mutated
/// afterwards. It is generic over the registry's metric handle `H`.
///
/// ```
/// # use prometheus_client::metrics::MetricType;
/// # use windows_service_collector::query::{identity, QuerySpec};
/// let spec = QuerySpec::build(
///     "information",
///     MetricType::Gauge,
///     "Win32_Service",
///     None,
///     vec!["Name", "DisplayName"],
///     identity,
/// )
/// .with_where_clause(Some("StartMode = 'Auto'".to_string()));
///
/// assert_eq!(
///     "SELECT * FROM Win32_Service WHERE StartMode = 'Auto'",
///     spec.query(),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct QuerySpec<H> {
    metric: H,
    metric_type: MetricType,
    value_transform: ValueTransform,
    class: Cow<'static, str>,
    property: Option<Cow<'static, str>>,
    label_keys: Vec<&'static str>,
    where_clause: Option<String>,
}

impl<H> QuerySpec<H> {
    /// Creates a new [`QuerySpec`].
    ///
    /// `property` names the single property to select, `None` selects all
    /// properties of `class`. No validation happens here, see
    /// [`QuerySpec::validate`].
    pub fn build(
        metric: H,
        metric_type: MetricType,
        class: impl Into<Cow<'static, str>>,
        property: Option<Cow<'static, str>>,
        label_keys: Vec<&'static str>,
        value_transform: ValueTransform,
    ) -> Self {
        Self {
            metric,
            metric_type,
            value_transform,
            class: class.into(),
            property,
            label_keys,
            where_clause: None,
        }
    }

    /// Constrains the query with a where clause. Blank clauses are ignored.
    pub fn with_where_clause(mut self, where_clause: Option<String>) -> Self {
        self.where_clause = where_clause.filter(|clause| !clause.trim().is_empty());
        self
    }

    /// Handle of the target metric.
    pub fn metric(&self) -> &H {
        &self.metric
    }

    /// Type of the target metric.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// The queried class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Property names whose values make up the label tuple, in label order.
    pub fn label_keys(&self) -> &[&'static str] {
        &self.label_keys
    }

    /// The constraining where clause, if any.
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Applies the value transform to a raw value.
    pub fn transform(&self, value: f64) -> f64 {
        (self.value_transform)(value)
    }

    /// Renders the query text.
    pub fn query(&self) -> String {
        let property = match self.property.as_deref() {
            Some(property) if !property.is_empty() => property,
            _ => "*",
        };

        let mut query = format!("SELECT {} FROM {}", property, self.class);
        if let Some(clause) = &self.where_clause {
            query.push_str(" WHERE ");
            query.push_str(clause);
        }
        query
    }

    /// Checks the label keys against the label arity declared on the target
    /// metric.
    pub fn validate(&self, metric_arity: usize) -> Result<(), Error> {
        if self.label_keys.len() != metric_arity {
            return Err(Error::LabelArity {
                metric: self.class.to_string(),
                expected: self.label_keys.len(),
                actual: metric_arity,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> QuerySpec<()> {
        QuerySpec::build(
            (),
            MetricType::Gauge,
            "Win32_Service",
            None,
            vec!["Name", "DisplayName", "ProcessID", "StartName"],
            identity,
        )
    }

    #[test]
    fn select_all_without_where_clause() {
        assert_eq!("SELECT * FROM Win32_Service", spec().query());
    }

    #[test]
    fn select_single_property() {
        let spec = QuerySpec::build(
            (),
            MetricType::Gauge,
            "Win32_Service",
            Some(Cow::Borrowed("State")),
            vec![],
            identity,
        );
        assert_eq!("SELECT State FROM Win32_Service", spec.query());
    }

    #[test]
    fn blank_where_clause_is_dropped() {
        let spec = spec().with_where_clause(Some("  ".to_string()));
        assert_eq!(None, spec.where_clause());
        assert_eq!("SELECT * FROM Win32_Service", spec.query());
    }

    #[test]
    fn arity_mismatch() {
        assert!(spec().validate(4).is_ok());
        match spec().validate(2) {
            Err(Error::LabelArity {
                expected, actual, ..
            }) => {
                assert_eq!(4, expected);
                assert_eq!(2, actual);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn transform_is_applied() {
        let scaled = QuerySpec::build(
            (),
            MetricType::Gauge,
            "Win32_Service",
            None,
            vec![],
            |v| v / 1000.0,
        );
        assert_eq!(1.5, scaled.transform(1500.0));
        assert_eq!(1.0, spec().transform(1.0));
    }
}

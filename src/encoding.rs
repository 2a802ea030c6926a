//! Categorical (one-hot) encoding.
//!
//! A categorical property is published as one gauge per vocabulary entry:
//! the entry matching the observed value is hot (`1.0`), every other entry is
//! cold (`0.0`). An observed value outside the vocabulary encodes as all-cold.
//!
//! ```
//! # use windows_service_collector::encoding::onehot;
//! # use windows_service_collector::vocabulary::START_MODES;
//! let encoded: Vec<_> = onehot("Auto", &START_MODES).collect();
//! assert_eq!(
//!     vec![
//!         ("boot", 0.0),
//!         ("system", 0.0),
//!         ("auto", 1.0),
//!         ("manual", 0.0),
//!         ("disabled", 0.0),
//!     ],
//!     encoded,
//! );
//! ```

use crate::registry::Batch;
use crate::vocabulary::Vocabulary;

/// Value of the entry matching the observed value.
pub const HOT: f64 = 1.0;

/// Value of every other entry.
pub const COLD: f64 = 0.0;

/// One-hot encodes `observed` against `vocabulary`, yielding each canonical
/// entry with its value, in vocabulary order.
///
/// At most one entry is hot: the first one matching `observed`, ignoring
/// ASCII case.
pub fn onehot<'v>(
    observed: &str,
    vocabulary: &'v Vocabulary,
) -> impl Iterator<Item = (&'static str, f64)> + 'v {
    let hot = vocabulary.position(observed);
    vocabulary
        .entries()
        .iter()
        .enumerate()
        .map(move |(i, entry)| (*entry, if Some(i) == hot { HOT } else { COLD }))
}

/// Emits one observation per `vocabulary` entry into `batch`, labeled
/// `(identity, entry)`.
///
/// Returns whether `observed` matched an entry.
pub fn encode_onehot<'a, H>(
    batch: &mut Batch<'a, H>,
    metric: &'a H,
    identity: &str,
    observed: &str,
    vocabulary: &Vocabulary,
) -> bool {
    let mut matched = false;
    for (entry, value) in onehot(observed, vocabulary) {
        matched |= value == HOT;
        batch.emit(metric, value, vec![identity.to_string(), entry.to_string()]);
    }
    matched
}

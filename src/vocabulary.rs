//! Fixed vocabularies of categorical service properties.
//!
//! See [`Vocabulary`] for details.

/// An ordered, fixed set of canonical category values.
///
/// Observed values are compared case-insensitively against the entries. An
/// observed value matching no entry is not an error; it encodes as all-cold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary {
    label: &'static str,
    entries: &'static [&'static str],
}

impl Vocabulary {
    /// Creates a new [`Vocabulary`] whose entries are reported under `label`.
    pub const fn new(label: &'static str, entries: &'static [&'static str]) -> Self {
        Self { label, entries }
    }

    /// The label key under which entries are reported.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The canonical entries, in vocabulary order.
    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vocabulary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry matching `observed`, ignoring ASCII case.
    pub fn position(&self, observed: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.eq_ignore_ascii_case(observed))
    }
}

/// `Win32_Service.State`.
pub const STATES: Vocabulary = Vocabulary::new(
    "state",
    &[
        "stopped",
        "start pending",
        "stop pending",
        "running",
        "continue pending",
        "pause pending",
        "paused",
        "unknown",
    ],
);

/// `Win32_Service.StartMode`.
pub const START_MODES: Vocabulary =
    Vocabulary::new("start_mode", &["boot", "system", "auto", "manual", "disabled"]);

/// `Win32_Service.Status`.
pub const STATUSES: Vocabulary = Vocabulary::new(
    "status",
    &[
        "ok",
        "error",
        "degraded",
        "unknown",
        "pred fail",
        "starting",
        "stopping",
        "service",
        "stressed",
        "nonrecover",
        "no contact",
        "lost comm",
    ],
);

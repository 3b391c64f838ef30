//! Diagnostic sink for per-row and per-request problems
//!
//! Problems that must not abort sibling work (unresolved references, failed
//! fetches, failed submissions) are recorded here and emitted as `tracing`
//! error events. One sink is shared by the whole run.

use std::fmt;
use std::sync::Mutex;

/// Category of a recorded problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A linked name had no match in the resolved set
    ReferenceUnresolved,
    /// A query failed and was treated as returning nothing
    FetchFailed,
    /// A create or update call failed
    SubmitFailed,
    /// The state fixer could not find the epic or the state it needed
    StateUnresolved,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ReferenceUnresolved => "reference_unresolved",
            DiagnosticKind::FetchFailed => "fetch_failed",
            DiagnosticKind::SubmitFailed => "submit_failed",
            DiagnosticKind::StateUnresolved => "state_unresolved",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Entity type or resource the problem occurred in
    pub entity_type: String,
    pub message: String,
}

/// Shared diagnostic sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem and log it
    pub fn record(&self, kind: DiagnosticKind, entity_type: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(kind = %kind, entity_type = %entity_type, "{}", message);
        let diagnostic = Diagnostic {
            kind,
            entity_type: entity_type.to_string(),
            message,
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries().iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

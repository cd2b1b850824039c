//! Per-test-case verdict aggregation.
//!
//! A [`ResultAggregator`] attaches to an event bus for the lifetime of one test
//! case, collects undefined steps and snippet suggestions, records the final
//! case result and renders it as a [`Verdict`]: passed, or a [`Diagnostic`]
//! that is an error, a skip, or an undefined-step report with snippets.

mod diagnostic;
mod listener;
mod snippets;

pub use diagnostic::{Diagnostic, DiagnosticKind, SKIPPED_MESSAGE, UndefinedStep, Verdict};
pub use listener::ResultAggregator;
pub use snippets::PendingSnippets;

use thiserror::Error;
use verdict_schema::Status;

/// The event producer broke its contract with the aggregator.
///
/// These are bugs upstream, never test outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictError {
    #[error("Unexpected result status: {0}")]
    UnexpectedStatus(Status),
    #[error("Test case finished UNDEFINED but no undefined step was reported")]
    MissingUndefinedStep,
    #[error("Test case finished {0} without an error")]
    MissingError(Status),
}

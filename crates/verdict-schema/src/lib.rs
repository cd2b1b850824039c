//! Test lifecycle event model for verdict.
//!
//! Defines result statuses, step locations, test steps (pickle steps and hooks)
//! and the three events a result aggregator listens to.
//! All other crates depend on these types.

pub mod event;
pub mod status;
pub mod step;

pub use event::{EventKind, SnippetsSuggested, TestCaseFinished, TestEvent, TestResult, TestStepFinished};
pub use status::Status;
pub use step::{DocStringArgument, HookStep, HookType, PickleStep, StepLocation, TestStep};

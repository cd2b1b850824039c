use crate::status::Status;
use crate::step::{StepLocation, TestStep};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use verdict_error::TestFailure;

/// Result of a step or test case.
///
/// The failure is shared so that whoever renders a verdict can hand back the
/// very same failure the runner reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: Status,
    #[serde(default)]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Arc<TestFailure>>,
}

impl TestResult {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            duration: Duration::ZERO,
            error: None,
        }
    }

    pub fn with_error(status: Status, error: Arc<TestFailure>) -> Self {
        Self {
            status,
            duration: Duration::ZERO,
            error: Some(error),
        }
    }

    pub fn passed() -> Self {
        Self::new(Status::Passed)
    }
}

/// A step (or hook) inside a test case finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestStepFinished {
    pub test_step: TestStep,
    pub result: TestResult,
}

/// A whole test case finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCaseFinished {
    pub result: TestResult,
}

/// Code suggestions for a step that has no implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetsSuggested {
    pub uri: Url,
    pub step_line: u32,
    pub snippets: Vec<String>,
}

impl SnippetsSuggested {
    pub fn location(&self) -> StepLocation {
        StepLocation::new(self.uri.clone(), self.step_line)
    }
}

/// The events a result aggregator consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TestEvent {
    TestStepFinished(TestStepFinished),
    TestCaseFinished(TestCaseFinished),
    SnippetsSuggested(SnippetsSuggested),
}

impl TestEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TestEvent::TestStepFinished(_) => EventKind::TestStepFinished,
            TestEvent::TestCaseFinished(_) => EventKind::TestCaseFinished,
            TestEvent::SnippetsSuggested(_) => EventKind::SnippetsSuggested,
        }
    }
}

impl From<TestStepFinished> for TestEvent {
    fn from(event: TestStepFinished) -> Self {
        TestEvent::TestStepFinished(event)
    }
}

impl From<TestCaseFinished> for TestEvent {
    fn from(event: TestCaseFinished) -> Self {
        TestEvent::TestCaseFinished(event)
    }
}

impl From<SnippetsSuggested> for TestEvent {
    fn from(event: SnippetsSuggested) -> Self {
        TestEvent::SnippetsSuggested(event)
    }
}

/// Event discriminant, used as the subscription key on a bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TestStepFinished,
    TestCaseFinished,
    SnippetsSuggested,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::TestStepFinished => write!(f, "test_step_finished"),
            EventKind::TestCaseFinished => write!(f, "test_case_finished"),
            EventKind::SnippetsSuggested => write!(f, "snippets_suggested"),
        }
    }
}

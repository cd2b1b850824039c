use crate::diagnostic::{Diagnostic, SKIPPED_MESSAGE, UndefinedStep, Verdict};
use crate::snippets::PendingSnippets;
use crate::VerdictError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use verdict_error::{TestFailure, skip};
use verdict_eventbus::{EventHandler, EventSubscriber, HandlerToken};
use verdict_schema::{
    EventKind, PickleStep, SnippetsSuggested, Status, TestCaseFinished, TestEvent, TestResult,
    TestStepFinished,
};

#[derive(Debug, Default)]
struct AggregatorState {
    pending_snippets: PendingSnippets,
    last_undefined_step: Option<PickleStep>,
    final_result: Option<TestResult>,
    finished: bool,
}

impl AggregatorState {
    fn on_step_finished(&mut self, event: &TestStepFinished) {
        if self.ignore_late(EventKind::TestStepFinished) {
            return;
        }
        if !event.result.status.is(Status::Undefined) {
            return;
        }
        let Some(step) = event.test_step.as_pickle_step() else {
            return;
        };
        tracing::debug!(location = %step.location(), text = %step.text, "step undefined");
        self.last_undefined_step = Some(step.clone());
    }

    fn on_snippets_suggested(&mut self, event: &SnippetsSuggested) {
        if self.ignore_late(EventKind::SnippetsSuggested) {
            return;
        }
        let location = event.location();
        if !self.pending_snippets.insert(location.clone(), event.snippets.clone()) {
            tracing::debug!(%location, "snippets already suggested for step, keeping the first");
        }
    }

    fn on_case_finished(&mut self, event: &TestCaseFinished) {
        if self.ignore_late(EventKind::TestCaseFinished) {
            return;
        }
        if let Some(previous) = &self.final_result {
            tracing::warn!(
                previous = %previous.status,
                current = %event.result.status,
                "test case finished twice, keeping the latest result"
            );
        }
        tracing::debug!(status = %event.result.status, "test case finished");
        self.final_result = Some(event.result.clone());
    }

    fn ignore_late(&self, kind: EventKind) -> bool {
        if self.finished {
            tracing::warn!(%kind, "event received after finish, ignoring");
        }
        self.finished
    }
}

/// Listens to the events of one test case and renders its verdict.
///
/// Subscribes to step-finished, snippets-suggested and case-finished events on
/// construction. Call [`finish`](Self::finish) once the case is done (dropping
/// the aggregator does it too), then ask for [`is_passed`](Self::is_passed) and
/// [`describe_failure`](Self::describe_failure).
///
/// One instance per test case. Handlers may be invoked from the runner's
/// thread; the state sits behind a single lock.
pub struct ResultAggregator {
    bus: Arc<dyn EventSubscriber>,
    strict: bool,
    state: Arc<Mutex<AggregatorState>>,
    tokens: Mutex<Vec<HandlerToken>>,
}

impl ResultAggregator {
    pub fn new(bus: Arc<dyn EventSubscriber>, strict: bool) -> Self {
        let state = Arc::new(Mutex::new(AggregatorState::default()));

        let step_state = Arc::clone(&state);
        let step_handler: EventHandler = Arc::new(move |event: &TestEvent| {
            if let TestEvent::TestStepFinished(event) = event {
                lock(&step_state).on_step_finished(event);
            }
        });

        let snippet_state = Arc::clone(&state);
        let snippet_handler: EventHandler = Arc::new(move |event: &TestEvent| {
            if let TestEvent::SnippetsSuggested(event) = event {
                lock(&snippet_state).on_snippets_suggested(event);
            }
        });

        let case_state = Arc::clone(&state);
        let case_handler: EventHandler = Arc::new(move |event: &TestEvent| {
            if let TestEvent::TestCaseFinished(event) = event {
                lock(&case_state).on_case_finished(event);
            }
        });

        let tokens = vec![
            bus.subscribe(EventKind::SnippetsSuggested, snippet_handler),
            bus.subscribe(EventKind::TestStepFinished, step_handler),
            bus.subscribe(EventKind::TestCaseFinished, case_handler),
        ];

        Self {
            bus,
            strict,
            state,
            tokens: Mutex::new(tokens),
        }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Stop listening. Safe to call more than once.
    pub fn finish(&self) {
        let tokens = std::mem::take(&mut *self.tokens.lock().unwrap_or_else(PoisonError::into_inner));
        if tokens.is_empty() {
            return;
        }
        lock(&self.state).finished = true;
        for token in tokens {
            self.bus.unsubscribe(token);
        }
        tracing::debug!("result aggregator finished");
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.state).finished
    }

    /// True unless a finished case reported something other than PASSED.
    ///
    /// A case that never reported a result counts as passed.
    pub fn is_passed(&self) -> bool {
        lock(&self.state)
            .final_result
            .as_ref()
            .is_none_or(|result| result.status.is(Status::Passed))
    }

    /// The status of the finished case, if it finished.
    pub fn status(&self) -> Option<Status> {
        lock(&self.state).final_result.as_ref().map(|result| result.status)
    }

    /// The step that most recently went undefined.
    pub fn last_undefined_step(&self) -> Option<PickleStep> {
        lock(&self.state).last_undefined_step.clone()
    }

    pub fn pending_snippets(&self) -> PendingSnippets {
        lock(&self.state).pending_snippets.clone()
    }

    /// Why the case did not pass, or `None` if it passed.
    ///
    /// An undefined-step diagnostic consumes the offending step's snippets, so
    /// render it once.
    pub fn describe_failure(&self) -> Result<Option<Diagnostic>, VerdictError> {
        let mut state = lock(&self.state);
        let Some(result) = state.final_result.clone() else {
            return Ok(None);
        };

        let diagnostic = match result.status {
            Status::Passed => return Ok(None),
            Status::Failed | Status::Ambiguous => Diagnostic::Error(required_error(&result)?),
            Status::Pending => self.pending_diagnostic(&result)?,
            Status::Skipped => skipped_diagnostic(&result),
            Status::Undefined => Diagnostic::UndefinedStep(self.undefined_step(&mut state)?),
            Status::Unused => return Err(VerdictError::UnexpectedStatus(result.status)),
        };
        Ok(Some(diagnostic))
    }

    /// Pass/fail plus diagnostic in one value.
    pub fn verdict(&self) -> Result<Verdict, VerdictError> {
        let diagnostic = self.describe_failure()?;
        Ok(Verdict {
            status: self.status(),
            passed: self.is_passed(),
            diagnostic,
        })
    }

    fn pending_diagnostic(&self, result: &TestResult) -> Result<Diagnostic, VerdictError> {
        let error = required_error(result)?;
        if self.strict {
            return Ok(Diagnostic::Error(error));
        }
        Ok(Diagnostic::Skip(Arc::new(TestFailure::skip_wrapping(&error))))
    }

    fn undefined_step(&self, state: &mut AggregatorState) -> Result<UndefinedStep, VerdictError> {
        let step = state
            .last_undefined_step
            .clone()
            .ok_or(VerdictError::MissingUndefinedStep)?;
        let snippets = state
            .pending_snippets
            .take(&step.location())
            .unwrap_or_default();
        let other_snippets = state.pending_snippets.groups().cloned().collect();

        Ok(UndefinedStep::new(step.text, snippets, other_snippets, self.strict))
    }
}

impl Drop for ResultAggregator {
    fn drop(&mut self) {
        self.finish();
    }
}

fn skipped_diagnostic(result: &TestResult) -> Diagnostic {
    match &result.error {
        None => Diagnostic::Skip(skip(SKIPPED_MESSAGE).into_shared()),
        Some(error) if error.is_skip() => Diagnostic::Skip(Arc::clone(error)),
        Some(error) => Diagnostic::Skip(Arc::new(TestFailure::skip_wrapping(error))),
    }
}

fn required_error(result: &TestResult) -> Result<Arc<TestFailure>, VerdictError> {
    result
        .error
        .clone()
        .ok_or(VerdictError::MissingError(result.status))
}

fn lock(state: &Mutex<AggregatorState>) -> MutexGuard<'_, AggregatorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

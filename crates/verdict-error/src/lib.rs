//! Test failure values for verdict.
//!
//! A [`TestFailure`] is what a finished step or test case carries when it did
//! not pass. Failures are shared as `Arc<TestFailure>` so a consumer can tell
//! whether it got the original failure back or a new one wrapping it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Kind of failure.
///
/// The kind decides how a host runner treats the failure: `Skip` is never a
/// hard failure, everything else is unless a verdict says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Error,
    Pending,
    Skip,
    Ambiguous,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Pending => write!(f, "pending"),
            FailureKind::Skip => write!(f, "skip"),
            FailureKind::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

/// A test failure with kind, message, optional cause and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    kind: FailureKind,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<Arc<TestFailure>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    context: Vec<(String, String)>,
}

impl TestFailure {
    pub fn new(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            context: Vec::new(),
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        kind: FailureKind,
        cause: Arc<TestFailure>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn cause(&self) -> Option<&Arc<TestFailure>> {
        self.cause.as_ref()
    }

    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// True when a host runner should report this as skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        self.kind == FailureKind::Skip
    }

    pub fn is_pending(&self) -> bool {
        self.kind == FailureKind::Pending
    }

    /// Wrap a shared failure in a new skip failure that keeps its message and
    /// points back at it as the cause.
    pub fn skip_wrapping(failure: &Arc<TestFailure>) -> Self {
        Self::with_cause(failure.message.clone(), FailureKind::Skip, Arc::clone(failure))
    }

    pub fn into_shared(self) -> Arc<TestFailure> {
        Arc::new(self)
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;

        if !self.context.is_empty() {
            write!(f, " (")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, ")")?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\nCaused by: {}", cause)?;
        }

        Ok(())
    }
}

impl std::error::Error for TestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|e| e as _)
    }
}

/// Failure builder for constructing failures with context
pub struct FailureBuilder {
    message: String,
    kind: FailureKind,
    cause: Option<Arc<TestFailure>>,
    context: Vec<(String, String)>,
}

impl FailureBuilder {
    pub fn new(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: None,
            context: Vec::new(),
        }
    }

    pub fn with_cause(mut self, cause: Arc<TestFailure>) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> TestFailure {
        TestFailure {
            message: self.message,
            kind: self.kind,
            cause: self.cause,
            context: self.context,
        }
    }
}

/// Convenience function to create plain errors (assertion failures, panics)
pub fn error(message: impl Into<String>) -> TestFailure {
    TestFailure::new(message, FailureKind::Error)
}

/// Convenience function to create pending failures
pub fn pending(message: impl Into<String>) -> TestFailure {
    TestFailure::new(message, FailureKind::Pending)
}

/// Convenience function to create skip failures
pub fn skip(message: impl Into<String>) -> TestFailure {
    TestFailure::new(message, FailureKind::Skip)
}

/// Convenience function to create ambiguous-match failures
pub fn ambiguous(message: impl Into<String>) -> TestFailure {
    TestFailure::new(message, FailureKind::Ambiguous)
}

/// Flatten an anyhow chain into nested failures, outermost first.
impl From<anyhow::Error> for TestFailure {
    fn from(err: anyhow::Error) -> Self {
        let mut messages: Vec<String> = err.chain().map(|e| e.to_string()).collect();
        let mut cause: Option<Arc<TestFailure>> = None;
        while messages.len() > 1 {
            let message = messages.pop().unwrap_or_default();
            let mut inner = TestFailure::new(message, FailureKind::Error);
            inner.cause = cause;
            cause = Some(Arc::new(inner));
        }
        let mut outer = TestFailure::new(messages.pop().unwrap_or_default(), FailureKind::Error);
        outer.cause = cause;
        outer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_failure_kind_display() {
        insta::assert_snapshot!(format!("{}", FailureKind::Error), @"error");
        assert_eq!(format!("{}", FailureKind::Pending), "pending");
        assert_eq!(format!("{}", FailureKind::Skip), "skip");
        assert_eq!(format!("{}", FailureKind::Ambiguous), "ambiguous");
    }

    #[test]
    fn test_failure_creation() {
        let failure = TestFailure::new("expected 3 but was 4", FailureKind::Error);
        assert_eq!(failure.message(), "expected 3 but was 4");
        assert_eq!(failure.kind(), FailureKind::Error);
        assert!(failure.cause().is_none());
    }

    #[test]
    fn test_failure_with_context() {
        let failure = error("step failed")
            .with_context("uri", "file:///a.feature")
            .with_context("line", "3");

        let ctx = failure.context();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx[0], ("uri".to_string(), "file:///a.feature".to_string()));
    }

    #[test]
    fn test_failure_builder() {
        let cause = error("root").into_shared();
        let failure = FailureBuilder::new("outer", FailureKind::Ambiguous)
            .with_cause(Arc::clone(&cause))
            .with_context("step", "I have 3 cukes")
            .build();

        assert_eq!(failure.kind(), FailureKind::Ambiguous);
        assert!(Arc::ptr_eq(failure.cause().unwrap(), &cause));
        assert_eq!(failure.context().len(), 1);
    }

    #[test]
    fn test_convenience_functions() {
        assert_eq!(error("e").kind(), FailureKind::Error);
        assert!(pending("p").is_pending());
        assert!(skip("s").is_skip());
        assert_eq!(ambiguous("a").kind(), FailureKind::Ambiguous);
        assert!(!error("e").is_skip());
    }

    #[test]
    fn test_skip_wrapping_keeps_message_and_points_at_original() {
        let original = pending("TODO: implement me").into_shared();
        let wrapped = TestFailure::skip_wrapping(&original);

        assert!(wrapped.is_skip());
        assert_eq!(wrapped.message(), "TODO: implement me");
        assert!(Arc::ptr_eq(wrapped.cause().unwrap(), &original));
    }

    #[test]
    fn test_failure_display() {
        let failure = error("boom");
        insta::assert_snapshot!(failure.to_string(), @"[error] boom");
    }

    #[test]
    fn test_failure_display_with_context_and_cause() {
        let failure = TestFailure::with_cause("outer", FailureKind::Skip, error("inner").into_shared())
            .with_context("line", "7");

        let display = format!("{}", failure);
        assert_eq!(display, "[skip] outer (line=7)\nCaused by: [error] inner");
    }

    #[test]
    fn test_error_source_is_cause() {
        let failure = TestFailure::with_cause("outer", FailureKind::Error, error("inner").into_shared());
        let source = failure.source().expect("source");
        assert_eq!(source.to_string(), "[error] inner");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = anyhow::anyhow!("disk full").context("could not write report");
        let failure: TestFailure = err.into();

        assert_eq!(failure.kind(), FailureKind::Error);
        assert_eq!(failure.message(), "could not write report");
        assert_eq!(failure.cause().unwrap().message(), "disk full");
        assert!(failure.cause().unwrap().cause().is_none());
    }

    #[test]
    fn test_serde_roundtrip_keeps_cause() {
        let failure = TestFailure::skip_wrapping(&pending("later").into_shared());
        let json = serde_json::to_string(&failure).unwrap();
        let back: TestFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }

    #[test]
    fn test_serde_kind_is_snake_case() {
        let json = serde_json::to_string(&skip("nope")).unwrap();
        insta::assert_snapshot!(json, @r#"{"kind":"skip","message":"nope"}"#);
    }
}

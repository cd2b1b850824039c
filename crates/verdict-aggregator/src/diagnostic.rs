use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use verdict_error::TestFailure;
use verdict_schema::Status;

/// Message used when a case is skipped without saying why.
pub const SKIPPED_MESSAGE: &str = "This scenario is skipped";

/// Kind of diagnostic a verdict carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Error,
    Skip,
    UndefinedStep,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Error => write!(f, "error"),
            DiagnosticKind::Skip => write!(f, "skip"),
            DiagnosticKind::UndefinedStep => write!(f, "undefined-step"),
        }
    }
}

/// Why a test case did not pass.
///
/// Serializes as `{kind, message, cause}`, plus `extra` holding the step text
/// and snippets for an undefined step.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A hard failure, handed back exactly as the runner reported it.
    Error(Arc<TestFailure>),
    /// The case should be reported as skipped.
    Skip(Arc<TestFailure>),
    /// A step had no implementation.
    UndefinedStep(UndefinedStep),
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::Error(_) => DiagnosticKind::Error,
            Diagnostic::Skip(_) => DiagnosticKind::Skip,
            Diagnostic::UndefinedStep(_) => DiagnosticKind::UndefinedStep,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Diagnostic::Error(failure) | Diagnostic::Skip(failure) => failure.message().to_string(),
            Diagnostic::UndefinedStep(undefined) => undefined.message(),
        }
    }

    /// The failure behind this diagnostic, if it has one.
    pub fn failure(&self) -> Option<&Arc<TestFailure>> {
        match self {
            Diagnostic::Error(failure) | Diagnostic::Skip(failure) => Some(failure),
            Diagnostic::UndefinedStep(_) => None,
        }
    }

    pub fn cause(&self) -> Option<&Arc<TestFailure>> {
        self.failure().and_then(|failure| failure.cause())
    }

    /// Whether a host runner should report the case as skipped.
    pub fn is_skip(&self) -> bool {
        match self {
            Diagnostic::Error(_) => false,
            Diagnostic::Skip(_) => true,
            Diagnostic::UndefinedStep(undefined) => undefined.is_skip(),
        }
    }
}

#[derive(Serialize)]
struct DiagnosticRepr<'a> {
    kind: DiagnosticKind,
    message: String,
    cause: Option<&'a Arc<TestFailure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<&'a UndefinedStep>,
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = match self {
            Diagnostic::UndefinedStep(undefined) => Some(undefined),
            Diagnostic::Error(_) | Diagnostic::Skip(_) => None,
        };
        DiagnosticRepr {
            kind: self.kind(),
            message: self.message(),
            cause: self.cause(),
            extra,
        }
        .serialize(serializer)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.message())
    }
}

/// Report for a test case that stopped on a step with no implementation.
///
/// Carries the snippets suggested for that step plus the snippets of every
/// other undefined step seen in the same case, in step location order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndefinedStep {
    pub step_text: String,
    pub snippets: Vec<String>,
    pub other_snippets: Vec<Vec<String>>,
    pub strict: bool,
}

impl UndefinedStep {
    pub fn new(
        step_text: impl Into<String>,
        snippets: Vec<String>,
        other_snippets: Vec<Vec<String>>,
        strict: bool,
    ) -> Self {
        Self {
            step_text: step_text.into(),
            snippets,
            other_snippets,
            strict,
        }
    }

    /// In lenient mode an undefined step skips the case.
    pub fn is_skip(&self) -> bool {
        !self.strict
    }

    pub fn is_fatal(&self) -> bool {
        self.strict
    }

    pub fn message(&self) -> String {
        if self.snippets.is_empty() {
            return "This step is undefined".to_string();
        }

        let mut out = format!(
            "The step \"{}\" is undefined. You can implement it using the snippet(s) below:\n\n",
            self.step_text
        );
        for snippet in &self.snippets {
            out.push_str(snippet);
            out.push('\n');
        }

        let others: Vec<&String> = self
            .other_snippets
            .iter()
            .flatten()
            .filter(|snippet| !self.snippets.contains(snippet))
            .unique()
            .collect();
        if !others.is_empty() {
            out.push_str("\nSome other steps were also undefined:\n\n");
            for snippet in others {
                out.push_str(snippet);
                out.push('\n');
            }
        }
        out
    }
}

impl fmt::Display for UndefinedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// The rendered outcome of one finished test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// None when no case-finished event was observed.
    pub status: Option<Status>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl Verdict {
    /// Passed, or only skipped. Host runners treat both as "not failed".
    pub fn is_ok(&self) -> bool {
        self.passed || self.diagnostic.as_ref().is_some_and(Diagnostic::is_skip)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.diagnostic) {
            (None, _) => write!(f, "PASSED (no result reported)"),
            (Some(status), None) => write!(f, "{}", status),
            (Some(status), Some(diagnostic)) => write!(f, "{}\n{}", status, diagnostic),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a test step or a whole test case.
///
/// `Unused` is part of the vocabulary (steps that were never reached can be
/// reported with it) but a finished test case must never carry it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Passed,
    Skipped,
    Pending,
    Undefined,
    Ambiguous,
    Failed,
    Unused,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Passed,
        Status::Skipped,
        Status::Pending,
        Status::Undefined,
        Status::Ambiguous,
        Status::Failed,
        Status::Unused,
    ];

    pub fn is(self, other: Status) -> bool {
        self == other
    }

    /// Whether this outcome is acceptable for a run.
    ///
    /// Pending and undefined steps are work in progress: fine in lenient
    /// mode, failures in strict mode.
    pub fn is_ok(self, strict: bool) -> bool {
        match self {
            Status::Passed | Status::Skipped => true,
            Status::Pending | Status::Undefined => !strict,
            Status::Ambiguous | Status::Failed | Status::Unused => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "PASSED",
            Status::Skipped => "SKIPPED",
            Status::Pending => "PENDING",
            Status::Undefined => "UNDEFINED",
            Status::Ambiguous => "AMBIGUOUS",
            Status::Failed => "FAILED",
            Status::Unused => "UNUSED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

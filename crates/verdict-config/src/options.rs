use crate::ValueError;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

static FEATURE_WITH_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)((?::\d+)*)$").expect("feature pattern is valid"));

/// Order in which pickles are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickleOrder {
    #[default]
    Lexical,
    Reverse,
    /// Shuffled. Without a seed the runner picks one.
    Random { seed: Option<u64> },
}

impl FromStr for PickleOrder {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "lexical" => Ok(PickleOrder::Lexical),
            "reverse" => Ok(PickleOrder::Reverse),
            "random" => Ok(PickleOrder::Random { seed: None }),
            other => other
                .strip_prefix("random:")
                .and_then(|seed| seed.parse().ok())
                .map(|seed| PickleOrder::Random { seed: Some(seed) })
                .ok_or_else(|| ValueError::PickleOrder(s.to_string())),
        }
    }
}

impl fmt::Display for PickleOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickleOrder::Lexical => write!(f, "lexical"),
            PickleOrder::Reverse => write!(f, "reverse"),
            PickleOrder::Random { seed: None } => write!(f, "random"),
            PickleOrder::Random { seed: Some(seed) } => write!(f, "random:{seed}"),
        }
    }
}

impl Serialize for PickleOrder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Naming style for suggested step definition snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetType {
    #[default]
    Underscore,
    Camelcase,
}

impl FromStr for SnippetType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "underscore" => Ok(SnippetType::Underscore),
            "camelcase" => Ok(SnippetType::Camelcase),
            _ => Err(ValueError::SnippetType(s.to_string())),
        }
    }
}

/// A feature path, optionally narrowed to scenarios on the given lines.
///
/// Written as `path[:line]*`, e.g. `features/cukes.feature:3:12`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureWithLines {
    pub path: PathBuf,
    pub lines: BTreeSet<u32>,
}

impl FeatureWithLines {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: BTreeSet::new(),
        }
    }

    pub fn with_lines(mut self, lines: impl IntoIterator<Item = u32>) -> Self {
        self.lines.extend(lines);
        self
    }
}

impl FromStr for FeatureWithLines {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = FEATURE_WITH_LINES
            .captures(s)
            .ok_or_else(|| ValueError::Feature(s.to_string()))?;
        let path = captures.get(1).map_or("", |m| m.as_str());
        if path.is_empty() {
            return Err(ValueError::Feature(s.to_string()));
        }
        let lines = captures
            .get(2)
            .map_or("", |m| m.as_str())
            .split(':')
            .filter(|line| !line.is_empty())
            .map(str::parse)
            .collect::<Result<BTreeSet<u32>, _>>()?;

        Ok(Self {
            path: PathBuf::from(path),
            lines,
        })
    }
}

impl fmt::Display for FeatureWithLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        for line in &self.lines {
            write!(f, ":{line}")?;
        }
        Ok(())
    }
}

impl Serialize for FeatureWithLines {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Options for one run, resolved from properties.
///
/// `strict` is what the result aggregator consults when a case ends PENDING
/// or UNDEFINED.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOptions {
    pub strict: bool,
    pub dry_run: bool,
    pub monochrome: bool,
    pub wip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub order: PickleOrder,
    pub features: Vec<FeatureWithLines>,
    pub rerun_features: Vec<FeatureWithLines>,
    #[serde(serialize_with = "serialize_patterns")]
    pub name_filters: Vec<Regex>,
    pub tag_filters: Vec<String>,
    pub glue: Vec<String>,
    pub glue_classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_factory: Option<String>,
    pub plugins: Vec<String>,
    pub snippet_type: SnippetType,
}

impl RunOptions {
    /// Features to run, rerun entries included.
    pub fn all_features(&self) -> impl Iterator<Item = &FeatureWithLines> {
        self.features.iter().chain(&self.rerun_features)
    }
}

fn serialize_patterns<S: Serializer>(patterns: &[Regex], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(patterns.iter().map(Regex::as_str))
}

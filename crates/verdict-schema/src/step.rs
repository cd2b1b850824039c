use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Where a step occurs: feature file URI plus line.
///
/// Ordered by URI first, then by line. Used as a map key so snippets for
/// several undefined steps come out in a stable, source-like order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepLocation {
    pub uri: Url,
    pub line: u32,
}

impl StepLocation {
    pub fn new(uri: Url, line: u32) -> Self {
        Self { uri, line }
    }
}

impl fmt::Display for StepLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.line)
    }
}

/// A doc string attached to a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocStringArgument {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub line: u32,
}

/// An executable scenario step, already resolved from its feature file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickleStep {
    pub uri: Url,
    pub line: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<DocStringArgument>,
}

impl PickleStep {
    pub fn new(uri: Url, line: u32, text: impl Into<String>) -> Self {
        Self {
            uri,
            line,
            text: text.into(),
            argument: None,
        }
    }

    pub fn with_doc_string(mut self, argument: DocStringArgument) -> Self {
        self.argument = Some(argument);
        self
    }

    pub fn location(&self) -> StepLocation {
        StepLocation::new(self.uri.clone(), self.line)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    BeforeScenario,
    AfterScenario,
    BeforeStep,
    AfterStep,
}

/// A hook run as part of a test case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStep {
    pub hook_type: HookType,
    /// Code location of the hook body, when the runner knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_location: Option<String>,
}

/// Anything a test case executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestStep {
    Pickle(PickleStep),
    Hook(HookStep),
}

impl TestStep {
    pub fn is_pickle_step(&self) -> bool {
        matches!(self, TestStep::Pickle(_))
    }

    pub fn as_pickle_step(&self) -> Option<&PickleStep> {
        match self {
            TestStep::Pickle(step) => Some(step),
            TestStep::Hook(_) => None,
        }
    }
}

impl From<PickleStep> for TestStep {
    fn from(step: PickleStep) -> Self {
        TestStep::Pickle(step)
    }
}

impl From<HookStep> for TestStep {
    fn from(step: HookStep) -> Self {
        TestStep::Hook(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn locations_order_by_uri_then_line() {
        let a2 = StepLocation::new(uri("file:///features/a.feature"), 2);
        let a10 = StepLocation::new(uri("file:///features/a.feature"), 10);
        let b5 = StepLocation::new(uri("file:///features/b.feature"), 5);

        let mut locations = vec![b5.clone(), a10.clone(), a2.clone()];
        locations.sort();
        assert_eq!(locations, vec![a2, a10, b5]);
    }

    #[test]
    fn line_order_is_numeric() {
        let nine = StepLocation::new(uri("file:///a.feature"), 9);
        let ten = StepLocation::new(uri("file:///a.feature"), 10);
        assert!(nine < ten);
    }

    #[test]
    fn location_display() {
        let loc = StepLocation::new(uri("classpath:com/example/cukes.feature"), 12);
        insta::assert_snapshot!(loc.to_string(), @"classpath:com/example/cukes.feature:12");
    }

    #[test]
    fn pickle_step_location() {
        let step = PickleStep::new(uri("file:///a.feature"), 4, "I have 3 cukes");
        assert_eq!(step.location(), StepLocation::new(uri("file:///a.feature"), 4));
    }

    #[test]
    fn hooks_are_not_pickle_steps() {
        let hook: TestStep = HookStep {
            hook_type: HookType::BeforeScenario,
            code_location: None,
        }
        .into();
        assert!(!hook.is_pickle_step());
        assert!(hook.as_pickle_step().is_none());

        let step: TestStep = PickleStep::new(uri("file:///a.feature"), 1, "x").into();
        assert!(step.is_pickle_step());
    }

    #[test]
    fn test_step_is_tagged_by_type() {
        let step: TestStep = PickleStep::new(uri("file:///a.feature"), 3, "a step")
            .with_doc_string(DocStringArgument {
                content: "{}".into(),
                content_type: Some("json".into()),
                line: 4,
            })
            .into();
        let value = serde_json::to_value(&step).unwrap();
        insta::assert_json_snapshot!(value, @r#"
        {
          "argument": {
            "content": "{}",
            "content_type": "json",
            "line": 4
          },
          "line": 3,
          "text": "a step",
          "type": "pickle",
          "uri": "file:///a.feature"
        }
        "#);
    }
}

use crate::ConfigError;
use crate::parser::ALL_PROPERTY_NAMES;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Flat property map, keyed by property name.
pub type Properties = BTreeMap<String, String>;

/// Properties file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    Json,
    #[default]
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, YAML when unknown.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// A file value. Files may write `strict: true` or `limit: 3` unquoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Integer(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::Text(value) => f.write_str(value),
        }
    }
}

/// Environment variable name for a property.
///
/// `cucumber.execution.dry-run` becomes `CUCUMBER_EXECUTION_DRY_RUN`.
pub fn env_key(name: &str) -> String {
    name.to_ascii_uppercase().replace(['.', '-'], "_")
}

/// Pick known properties out of a set of variables.
///
/// A property may be given under its own name or its [`env_key`]; the
/// upper-case form wins when both are present.
pub fn properties_from_vars<I, K, V>(vars: I) -> Properties
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    ALL_PROPERTY_NAMES
        .iter()
        .filter_map(|name| {
            vars.get(&env_key(name))
                .or_else(|| vars.get(*name))
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Known properties set in the process environment.
pub fn properties_from_env() -> Properties {
    properties_from_vars(std::env::vars())
}

/// Load a flat property map from a YAML or JSON file.
pub fn load_properties(path: &Path) -> Result<Properties, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let values: BTreeMap<String, Option<ScalarValue>> = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => {
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        }
        ConfigFormat::Yaml if contents.trim().is_empty() => BTreeMap::new(),
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        }
    };

    let properties: Properties = values
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value.to_string())))
        .collect();
    for name in properties.keys() {
        if !ALL_PROPERTY_NAMES.contains(&name.as_str()) {
            tracing::warn!(property = %name, path = %path.display(), "unknown property");
        }
    }
    tracing::debug!(path = %path.display(), count = properties.len(), "loaded properties");
    Ok(properties)
}

/// Properties from an optional file, overridden by the environment.
pub fn resolve_properties(file: Option<&Path>) -> Result<Properties, ConfigError> {
    let mut properties = match file {
        Some(path) => load_properties(path)?,
        None => Properties::new(),
    };
    properties.extend(properties_from_env());
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EXECUTION_DRY_RUN_PROPERTY_NAME, EXECUTION_STRICT_PROPERTY_NAME};
    use tempfile::TempDir;

    #[test]
    fn env_key_upper_cases_and_replaces_separators() {
        assert_eq!(env_key("cucumber.execution.dry-run"), "CUCUMBER_EXECUTION_DRY_RUN");
        assert_eq!(env_key("cucumber.options"), "CUCUMBER_OPTIONS");
    }

    #[test]
    fn vars_pick_known_properties_only() {
        let properties = properties_from_vars([
            ("CUCUMBER_EXECUTION_STRICT", "true"),
            ("cucumber.execution.dry-run", "true"),
            ("CUCUMBER_UNKNOWN", "x"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[EXECUTION_STRICT_PROPERTY_NAME], "true");
        assert_eq!(properties[EXECUTION_DRY_RUN_PROPERTY_NAME], "true");
    }

    #[test]
    fn upper_case_form_wins() {
        let properties = properties_from_vars([
            ("cucumber.execution.strict", "false"),
            ("CUCUMBER_EXECUTION_STRICT", "true"),
        ]);
        assert_eq!(properties[EXECUTION_STRICT_PROPERTY_NAME], "true");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.properties")), ConfigFormat::Yaml);
    }

    #[test]
    fn load_yaml_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.yaml");
        std::fs::write(
            &path,
            "cucumber.execution.strict: true\ncucumber.execution.limit: 3\ncucumber.glue: com.example\ncucumber.plugin:\n",
        )
        .unwrap();

        let properties = load_properties(&path).unwrap();

        assert_eq!(properties["cucumber.execution.strict"], "true");
        assert_eq!(properties["cucumber.execution.limit"], "3");
        assert_eq!(properties["cucumber.glue"], "com.example");
        assert!(!properties.contains_key("cucumber.plugin"));
    }

    #[test]
    fn load_json_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.json");
        std::fs::write(&path, r#"{"cucumber.execution.strict": "true", "cucumber.execution.dry-run": false}"#)
            .unwrap();

        let properties = load_properties(&path).unwrap();

        assert_eq!(properties["cucumber.execution.strict"], "true");
        assert_eq!(properties["cucumber.execution.dry-run"], "false");
    }

    #[test]
    fn empty_yaml_file_has_no_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();

        assert!(load_properties(&path).unwrap().is_empty());
    }

    #[test]
    fn load_missing_file() {
        let err = load_properties(Path::new("/no/such/verdict.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_malformed_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_properties(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn nested_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested.yaml");
        std::fs::write(&path, "cucumber:\n  execution:\n    strict: true\n").unwrap();

        let err = load_properties(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}

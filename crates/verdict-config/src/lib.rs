//! Run options for verdict.
//!
//! Options come from `cucumber.*` properties. Properties are gathered from a
//! YAML or JSON file and from the process environment, then parsed into
//! [`RunOptions`]. The `cucumber.options` property holds command-line style
//! flags that form the base; every other property is applied on top.

use std::num::ParseIntError;
use std::path::PathBuf;

mod options;
mod parser;
mod sources;

pub use options::{FeatureWithLines, PickleOrder, RunOptions, SnippetType};
pub use parser::{
    ALL_PROPERTY_NAMES, ANSI_COLORS_DISABLED_PROPERTY_NAME, EXECUTION_DRY_RUN_PROPERTY_NAME,
    EXECUTION_LIMIT_PROPERTY_NAME, EXECUTION_ORDER_PROPERTY_NAME, EXECUTION_STRICT_PROPERTY_NAME,
    FEATURES_PROPERTY_NAME, FILTER_NAME_PROPERTY_NAME, FILTER_TAGS_PROPERTY_NAME,
    GLUE_CLASSES_PROPERTY_NAME, GLUE_PROPERTY_NAME, OBJECT_FACTORY_PROPERTY_NAME,
    OPTIONS_PROPERTY_NAME, PLUGIN_PROPERTY_NAME, SNIPPET_TYPE_PROPERTY_NAME, WIP_PROPERTY_NAME,
    parse_properties, shell_words,
};
pub use sources::{
    ConfigFormat, Properties, env_key, load_properties, properties_from_env,
    properties_from_vars, resolve_properties,
};

/// Errors raised while gathering or parsing properties.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse '{name}' with value '{value}'")]
    Property {
        name: String,
        value: String,
        #[source]
        source: ValueError,
    },

    /// `cucumber.options` could not be parsed as command-line flags.
    #[error(transparent)]
    Options(ValueError),

    #[error("Failed to read properties file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON properties file {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse YAML properties file {}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Why a single property value was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error(transparent)]
    Integer(#[from] ParseIntError),

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error("unknown pickle order '{0}', expected lexical, reverse, random or random:<seed>")]
    PickleOrder(String),

    #[error("unknown snippet type '{0}', expected underscore or camelcase")]
    SnippetType(String),

    #[error("'{0}' is not a feature path")]
    Feature(String),

    #[error("Failed to read rerun file {}", path.display())]
    RerunFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Options(#[from] clap::Error),
}

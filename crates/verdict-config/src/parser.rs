use crate::options::{FeatureWithLines, PickleOrder, RunOptions, SnippetType};
use crate::sources::Properties;
use crate::{ConfigError, ValueError};
use clap::Parser;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const OPTIONS_PROPERTY_NAME: &str = "cucumber.options";
pub const ANSI_COLORS_DISABLED_PROPERTY_NAME: &str = "cucumber.ansi-colors.disabled";
pub const EXECUTION_DRY_RUN_PROPERTY_NAME: &str = "cucumber.execution.dry-run";
pub const EXECUTION_LIMIT_PROPERTY_NAME: &str = "cucumber.execution.limit";
pub const EXECUTION_ORDER_PROPERTY_NAME: &str = "cucumber.execution.order";
pub const EXECUTION_STRICT_PROPERTY_NAME: &str = "cucumber.execution.strict";
pub const WIP_PROPERTY_NAME: &str = "cucumber.execution.wip";
pub const FEATURES_PROPERTY_NAME: &str = "cucumber.features";
pub const FILTER_NAME_PROPERTY_NAME: &str = "cucumber.filter.name";
pub const FILTER_TAGS_PROPERTY_NAME: &str = "cucumber.filter.tags";
pub const GLUE_PROPERTY_NAME: &str = "cucumber.glue";
pub const GLUE_CLASSES_PROPERTY_NAME: &str = "cucumber.glue-classes";
pub const OBJECT_FACTORY_PROPERTY_NAME: &str = "cucumber.object-factory";
pub const PLUGIN_PROPERTY_NAME: &str = "cucumber.plugin";
pub const SNIPPET_TYPE_PROPERTY_NAME: &str = "cucumber.snippet-type";

/// Every property the parser understands.
pub const ALL_PROPERTY_NAMES: [&str; 15] = [
    OPTIONS_PROPERTY_NAME,
    ANSI_COLORS_DISABLED_PROPERTY_NAME,
    EXECUTION_DRY_RUN_PROPERTY_NAME,
    EXECUTION_LIMIT_PROPERTY_NAME,
    EXECUTION_ORDER_PROPERTY_NAME,
    EXECUTION_STRICT_PROPERTY_NAME,
    WIP_PROPERTY_NAME,
    FEATURES_PROPERTY_NAME,
    FILTER_NAME_PROPERTY_NAME,
    FILTER_TAGS_PROPERTY_NAME,
    GLUE_PROPERTY_NAME,
    GLUE_CLASSES_PROPERTY_NAME,
    OBJECT_FACTORY_PROPERTY_NAME,
    PLUGIN_PROPERTY_NAME,
    SNIPPET_TYPE_PROPERTY_NAME,
];

static SHELL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|\S+"#).expect("shell word pattern is valid"));

/// Flags accepted inside `cucumber.options`.
#[derive(Debug, Parser)]
#[command(
    name = "cucumber.options",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct CommandLineOptions {
    #[arg(long, overrides_with = "no_strict")]
    strict: bool,

    #[arg(long = "no-strict", overrides_with = "strict")]
    no_strict: bool,

    #[arg(short = 'd', long)]
    dry_run: bool,

    #[arg(short = 'm', long)]
    monochrome: bool,

    #[arg(short = 'w', long)]
    wip: bool,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long)]
    order: Option<PickleOrder>,

    #[arg(short = 'n', long = "name")]
    names: Vec<String>,

    #[arg(short = 't', long = "tags")]
    tags: Vec<String>,

    #[arg(short = 'g', long = "glue")]
    glue: Vec<String>,

    #[arg(short = 'p', long = "plugin")]
    plugins: Vec<String>,

    #[arg(long = "object-factory")]
    object_factory: Option<String>,

    #[arg(long = "snippets")]
    snippets: Option<SnippetType>,

    /// Feature paths, `@`-prefixed entries are rerun files.
    features: Vec<String>,
}

impl CommandLineOptions {
    fn into_run_options(self) -> Result<RunOptions, ValueError> {
        let mut options = RunOptions {
            strict: self.strict && !self.no_strict,
            dry_run: self.dry_run,
            monochrome: self.monochrome,
            wip: self.wip,
            limit: self.limit,
            order: self.order.unwrap_or_default(),
            tag_filters: self.tags,
            glue: self.glue,
            plugins: self.plugins,
            object_factory: self.object_factory,
            snippet_type: self.snippets.unwrap_or_default(),
            ..RunOptions::default()
        };
        for name in &self.names {
            options.name_filters.push(Regex::new(name)?);
        }
        for feature in &self.features {
            add_feature(&mut options, feature)?;
        }
        Ok(options)
    }
}

/// Split a string into words, honouring single and double quotes.
pub fn shell_words(line: &str) -> Vec<String> {
    SHELL_WORD
        .captures_iter(line)
        .filter_map(|captures| {
            captures
                .get(1)
                .or_else(|| captures.get(2))
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Parse `cucumber.*` properties into run options.
///
/// `cucumber.options` supplies the base and its errors are reported as they
/// come from the flag parser. Scalar properties replace what it set, list
/// properties add to it. Empty values are ignored.
pub fn parse_properties(properties: &Properties) -> Result<RunOptions, ConfigError> {
    let mut options = match properties
        .get(OPTIONS_PROPERTY_NAME)
        .filter(|value| !value.is_empty())
    {
        Some(value) => {
            tracing::debug!(property = OPTIONS_PROPERTY_NAME, %value, "parsing command line options");
            parse_command_line(value).map_err(ConfigError::Options)?
        }
        None => RunOptions::default(),
    };

    apply(properties, ANSI_COLORS_DISABLED_PROPERTY_NAME, parse_bool, |v| {
        options.monochrome = v
    })?;
    apply(properties, EXECUTION_DRY_RUN_PROPERTY_NAME, parse_bool, |v| {
        options.dry_run = v
    })?;
    apply(
        properties,
        EXECUTION_LIMIT_PROPERTY_NAME,
        |value| Ok(value.trim().parse::<usize>()?),
        |v| options.limit = Some(v),
    )?;
    apply(properties, EXECUTION_ORDER_PROPERTY_NAME, str::parse::<PickleOrder>, |v| {
        options.order = v
    })?;
    apply(properties, EXECUTION_STRICT_PROPERTY_NAME, parse_bool, |v| {
        options.strict = v
    })?;
    apply(
        properties,
        FEATURES_PROPERTY_NAME,
        |value| {
            let mut parsed = RunOptions::default();
            for part in split_list(value) {
                add_feature(&mut parsed, part)?;
            }
            Ok(parsed)
        },
        |parsed| {
            options.features.extend(parsed.features);
            options.rerun_features.extend(parsed.rerun_features);
        },
    )?;
    apply(properties, FILTER_NAME_PROPERTY_NAME, |v| Ok(Regex::new(v)?), |v| {
        options.name_filters.push(v)
    })?;
    apply(properties, FILTER_TAGS_PROPERTY_NAME, owned, |v| {
        options.tag_filters.push(v)
    })?;
    apply(properties, GLUE_PROPERTY_NAME, owned_list, |v| {
        options.glue.extend(v)
    })?;
    apply(properties, OBJECT_FACTORY_PROPERTY_NAME, owned, |v| {
        options.object_factory = Some(v)
    })?;
    apply(properties, PLUGIN_PROPERTY_NAME, owned_list, |v| {
        options.plugins.extend(v)
    })?;
    apply(properties, SNIPPET_TYPE_PROPERTY_NAME, str::parse::<SnippetType>, |v| {
        options.snippet_type = v
    })?;
    apply(properties, WIP_PROPERTY_NAME, parse_bool, |v| options.wip = v)?;
    apply(properties, GLUE_CLASSES_PROPERTY_NAME, owned_list, |v| {
        options.glue_classes.extend(v)
    })?;

    Ok(options)
}

fn apply<T>(
    properties: &Properties,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, ValueError>,
    set: impl FnOnce(T),
) -> Result<(), ConfigError> {
    let Some(value) = properties.get(name).filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    let parsed = parse(value).map_err(|source| ConfigError::Property {
        name: name.to_string(),
        value: value.clone(),
        source,
    })?;
    tracing::debug!(property = name, %value, "applied property");
    set(parsed);
    Ok(())
}

fn parse_command_line(value: &str) -> Result<RunOptions, ValueError> {
    CommandLineOptions::try_parse_from(shell_words(value))?.into_run_options()
}

/// Anything but a case-insensitive `true` is false.
fn parse_bool(value: &str) -> Result<bool, ValueError> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

fn owned(value: &str) -> Result<String, ValueError> {
    Ok(value.to_string())
}

fn owned_list(value: &str) -> Result<Vec<String>, ValueError> {
    Ok(split_list(value).map(str::to_string).collect())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn add_feature(options: &mut RunOptions, entry: &str) -> Result<(), ValueError> {
    match entry.strip_prefix('@') {
        Some(rerun_file) => options
            .rerun_features
            .extend(read_rerun_file(Path::new(rerun_file))?),
        None => options.features.push(entry.parse()?),
    }
    Ok(())
}

/// A rerun file lists `path[:line]*` entries separated by whitespace.
fn read_rerun_file(path: &Path) -> Result<Vec<FeatureWithLines>, ValueError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ValueError::RerunFile {
        path: path.to_path_buf(),
        source,
    })?;
    contents.split_whitespace().map(str::parse).collect()
}

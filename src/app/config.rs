use crate::app::cli::Cli;
use crate::app::error::RunError;
use crate::app::models::{Direction, RuntimeConfig};
use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "mdtree";

/// Raw config file. Every field is kept loose so one bad value only resets that field.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    default_language_tag: Option<Value>,
    default_direction: Option<Value>,
    stylesheet_path: Option<Value>,
    extra_engine_args: Option<Value>,
    engine_path: Option<Value>,
    engine_timeout_secs: Option<Value>,
    fail_fast: Option<Value>,
    exclude: Option<Value>,
    respect_gitignore: Option<Value>,
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

fn default_config_paths() -> Vec<PathBuf> {
    dirs::config_dir()
        .map(|dir| {
            let base = dir.join(APP_DIR);
            vec![base.join("config.json"), base.join("config.toml")]
        })
        .unwrap_or_default()
}

/// An explicit path must exist; otherwise the first default location that does is used.
fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(RunError::ConfigNotFound(path.to_path_buf()).into());
        }
        return Ok(Some(path.to_path_buf()));
    }
    Ok(default_config_paths().into_iter().find(|p| p.is_file()))
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

fn parse_config(content: &str, toml_format: bool) -> Result<ConfigFile> {
    if toml_format {
        toml::from_str(content).context("Failed to parse TOML config")
    } else {
        serde_json::from_str(content).context("Failed to parse JSON config")
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config at {:?}", path))?;

    Ok(parse_config(&content, is_toml(path)).unwrap_or_else(|err| {
        log::warn!("{:#}; using defaults for every field", err);
        ConfigFile::default()
    }))
}

/// Order-preserving merge with duplicates removed.
fn merge_vecs(file_vec: Vec<String>, cli_vec: Option<Vec<String>>) -> Vec<String> {
    let mut combined = file_vec;
    if let Some(mut cli_items) = cli_vec {
        combined.append(&mut cli_items);
    }
    let mut seen = std::collections::HashSet::new();
    combined.retain(|item| seen.insert(item.clone()));
    combined
}

fn invalid(field: &str, value: &Value, expected: &str) {
    log::warn!("Config field `{field}` = {value} is not {expected}; using the default");
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Validate each field on its own, falling back to the default for anything malformed.
fn apply_config_file(file: ConfigFile, base_dir: Option<&Path>) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();

    for key in file.unknown.keys() {
        log::warn!("Ignoring unknown config field `{key}`");
    }

    if let Some(v) = file.default_language_tag {
        match v
            .as_str()
            .map(str::trim)
            .filter(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
        {
            Some(tag) => config.default_language_tag = tag.to_ascii_lowercase(),
            None => invalid("defaultLanguageTag", &v, "a two-letter language code"),
        }
    }

    if let Some(v) = file.default_direction {
        match v.as_str().and_then(Direction::parse) {
            Some(direction) => config.default_direction = direction,
            None => invalid("defaultDirection", &v, "\"ltr\" or \"rtl\""),
        }
    }

    if let Some(v) = file.stylesheet_path {
        match v.as_str().filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let path = match base_dir {
                    Some(dir) if Path::new(raw).is_relative() => dir.join(raw),
                    _ => PathBuf::from(raw),
                };
                if path.is_file() {
                    config.stylesheet_path = Some(path);
                } else {
                    log::warn!(
                        "Stylesheet {} does not exist; pages will have no stylesheet",
                        path.display()
                    );
                }
            }
            None => invalid("stylesheetPath", &v, "a file path"),
        }
    }

    if let Some(v) = file.extra_engine_args {
        match string_list(&v) {
            Some(args) => config.extra_engine_args = args,
            None => invalid("extraEngineArgs", &v, "a list of strings"),
        }
    }

    if let Some(v) = file.engine_path {
        match v.as_str().filter(|s| !s.trim().is_empty()) {
            Some(path) => config.engine_path = Some(PathBuf::from(path)),
            None => invalid("enginePath", &v, "a program name or path"),
        }
    }

    if let Some(v) = file.engine_timeout_secs {
        match v.as_u64().filter(|secs| *secs > 0) {
            Some(secs) => config.engine_timeout = Duration::from_secs(secs),
            None => invalid("engineTimeoutSecs", &v, "a positive number of seconds"),
        }
    }

    if let Some(v) = file.fail_fast {
        match v.as_bool() {
            Some(flag) => config.fail_fast = flag,
            None => invalid("failFast", &v, "true or false"),
        }
    }

    if let Some(v) = file.respect_gitignore {
        match v.as_bool() {
            Some(flag) => config.respect_gitignore = flag,
            None => invalid("respectGitignore", &v, "true or false"),
        }
    }

    if let Some(v) = file.exclude {
        match string_list(&v) {
            Some(patterns) => config.exclude = valid_globs(patterns),
            None => invalid("exclude", &v, "a list of glob patterns"),
        }
    }

    config
}

fn valid_globs(patterns: Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .filter(|pat| match Glob::new(pat) {
            Ok(_) => true,
            Err(err) => {
                log::warn!("Dropping exclude pattern {:?}: {}", pat, err);
                false
            }
        })
        .collect()
}

pub fn resolve_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match locate_config_file(cli.config.as_deref())? {
        Some(path) => {
            log::info!("Using config {}", path.display());
            let file = load_config_file(&path)?;
            apply_config_file(file, path.parent())
        }
        None => RuntimeConfig::default(),
    };

    config.exclude = merge_vecs(config.exclude, cli.exclude.clone().map(valid_globs));
    config.fail_fast |= cli.fail_fast;

    Ok(config)
}

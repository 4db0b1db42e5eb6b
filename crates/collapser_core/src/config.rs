use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use dom::SelectorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heuristics::Heuristics;

pub const DEFAULT_SETTINGS_FILE: &str = "collapser.toml";
const ENV_PREFIX: &str = "COLLAPSER__";
/// Separator for list overrides in the environment. Selectors may contain
/// commas, so lists are split on semicolons.
const ENV_LIST_SEPARATOR: char = ';';

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field} selector '{selector}': {source}")]
    Selector {
        field: &'static str,
        selector: String,
        source: SelectorError,
    },
    #[error("{field} must list at least one entry")]
    EmptyList { field: &'static str },
}

/// Tunable heuristics and timings. Every field has a default so a settings
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub startup_delay_ms: u64,
    pub debounce_ms: u64,
    pub min_text_chars: usize,
    pub long_text_chars: usize,
    pub preview_max_chars: usize,
    pub candidate_selectors: Vec<String>,
    pub response_selectors: Vec<String>,
    pub structural_selectors: Vec<String>,
    pub user_markers: Vec<String>,
    pub assistant_markers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            startup_delay_ms: 1000,
            debounce_ms: 500,
            min_text_chars: 20,
            long_text_chars: 50,
            preview_max_chars: 150,
            candidate_selectors: owned(&[
                "[class*=\"message\"]",
                "[class*=\"Message\"]",
                "[data-message-author-role]",
                "[data-testid*=\"conversation-turn\"]",
                "[role=\"article\"]",
                "[class*=\"prose\"]",
                "[class*=\"markdown\"]",
                "[class*=\"chat\"] > div",
                "[class*=\"conversation\"] > div",
            ]),
            response_selectors: owned(&[
                "[class*=\"markdown\"]",
                "[class*=\"prose\"]",
                "[class*=\"response\"]",
                "[data-message-author-role=\"assistant\"]",
            ]),
            structural_selectors: owned(&[
                "p", "pre", "code", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
                "span",
            ]),
            user_markers: owned(&["user", "human"]),
            assistant_markers: owned(&["assistant", "bot-message", "ai-message"]),
        }
    }
}

impl Settings {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.candidate_selectors.is_empty() {
            return Err(SettingsError::EmptyList {
                field: "candidate_selectors",
            });
        }
        if self.structural_selectors.is_empty() {
            return Err(SettingsError::EmptyList {
                field: "structural_selectors",
            });
        }
        Heuristics::from_settings(self).map(drop)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Loads settings from `path` (or `collapser.toml` in the working directory
/// when present) and applies `COLLAPSER__*` environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, SettingsError> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            match fs::read_to_string(default_path) {
                Ok(raw) => parse_settings(&raw, default_path)?,
                Err(_) => Settings::default(),
            }
        }
    };

    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&raw, path)
}

fn parse_settings(raw: &str, path: &Path) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    override_value(&env, "STARTUP_DELAY_MS", &mut settings.startup_delay_ms);
    override_value(&env, "DEBOUNCE_MS", &mut settings.debounce_ms);
    override_value(&env, "MIN_TEXT_CHARS", &mut settings.min_text_chars);
    override_value(&env, "LONG_TEXT_CHARS", &mut settings.long_text_chars);
    override_value(&env, "PREVIEW_MAX_CHARS", &mut settings.preview_max_chars);

    override_list(&env, "CANDIDATE_SELECTORS", &mut settings.candidate_selectors);
    override_list(&env, "RESPONSE_SELECTORS", &mut settings.response_selectors);
    override_list(&env, "STRUCTURAL_SELECTORS", &mut settings.structural_selectors);
    override_list(&env, "USER_MARKERS", &mut settings.user_markers);
    override_list(&env, "ASSISTANT_MARKERS", &mut settings.assistant_markers);
}

fn override_value<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let name = format!("{ENV_PREFIX}{key}");
    let Some(raw) = env(&name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(variable = %name, value = %raw, "ignoring unparsable override"),
    }
}

fn override_list(env: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut Vec<String>) {
    let name = format!("{ENV_PREFIX}{key}");
    if let Some(raw) = env(&name) {
        *slot = raw
            .split(ENV_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect();
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

//! Compiled form of the tunable detection heuristics.
//!
//! Detection is best effort against markup this crate does not control: the
//! selector lists and thresholds are expected to be retuned when the host
//! page changes, not proven correct for every page.

use dom::Selector;

use crate::config::{Settings, SettingsError};

#[derive(Debug, Clone)]
pub struct Heuristics {
    /// Candidate selectors, most specific first. A candidate found by an
    /// earlier selector is wrapped before one found by a later selector.
    pub candidates: Vec<Selector>,
    pub structural: Selector,
    /// Sub-element whose text previews a non-user message. `None` when the
    /// configured list is empty, in which case such previews stay empty.
    pub response_content: Option<Selector>,
    pub user_markers: Vec<String>,
    pub assistant_markers: Vec<String>,
    pub min_text_chars: usize,
    pub long_text_chars: usize,
    pub preview_max_chars: usize,
}

impl Heuristics {
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let candidates = settings
            .candidate_selectors
            .iter()
            .map(|source| compile("candidate", source))
            .collect::<Result<Vec<_>, _>>()?;
        let structural = compile_list("structural", &settings.structural_selectors)?;
        let response_content = if settings.response_selectors.is_empty() {
            None
        } else {
            Some(compile_list("response", &settings.response_selectors)?)
        };

        Ok(Self {
            candidates,
            structural,
            response_content,
            user_markers: lowercase(&settings.user_markers),
            assistant_markers: lowercase(&settings.assistant_markers),
            min_text_chars: settings.min_text_chars,
            long_text_chars: settings.long_text_chars,
            preview_max_chars: settings.preview_max_chars,
        })
    }
}

fn compile(field: &'static str, source: &str) -> Result<Selector, SettingsError> {
    Selector::parse(source).map_err(|source_error| SettingsError::Selector {
        field,
        selector: source.to_owned(),
        source: source_error,
    })
}

fn compile_list(field: &'static str, sources: &[String]) -> Result<Selector, SettingsError> {
    // Validate one by one so the error names the offending entry.
    for source in sources {
        compile(field, source)?;
    }
    Selector::parse_list(sources).map_err(|source| SettingsError::Selector {
        field,
        selector: sources.join(", "),
        source,
    })
}

fn lowercase(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

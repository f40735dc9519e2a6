//! Regex discovery over the loaded-unit and installed-unit-file inventories.

use crate::types::unit::{ActiveState, Unit, UnitStatus};
use crate::{Error, Result, UnitFile, util};

use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, BTreeSet};

const ENABLED_STATES: &[&str] = &[
    "enabled",
    "enabled-runtime",
    "linked",
    "linked-runtime",
    "alias",
];
const MASKED_STATES: &[&str] = &["masked", "masked-runtime"];

/// Options for [`Manager::match_units`](crate::Manager::match_units).
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct MatchOptions {
    /// Unit type suffixes to keep. Empty keeps nothing.
    pub types: Vec<String>,
    pub case_insensitive: bool,
    /// Also report units that only exist as installed unit files.
    pub include_installed_only: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            types: vec![
                "service".to_string(),
                "socket".to_string(),
                "timer".to_string(),
            ],
            case_insensitive: true,
            include_installed_only: true,
        }
    }
}

impl MatchOptions {
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    pub fn include_installed_only(mut self, yes: bool) -> Self {
        self.include_installed_only = yes;
        self
    }
}

/// Compiled name patterns plus the type filter.
#[derive(Clone, Debug)]
pub(crate) struct UnitFilter {
    patterns: Vec<Regex>,
    types: BTreeSet<String>,
}

impl UnitFilter {
    pub(crate) fn new<S: AsRef<str>>(patterns: &[S], opts: &MatchOptions) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                RegexBuilder::new(p)
                    .case_insensitive(opts.case_insensitive)
                    .build()
                    .map_err(|e| Error::invalid_input(format!("invalid pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            types: opts.types.iter().map(|t| t.trim_start_matches('.').to_string()).collect(),
        })
    }

    /// Type in the filter and at least one pattern found anywhere in the name.
    pub(crate) fn accepts(&self, name: &str) -> bool {
        let kind = util::kind_from_name(name);
        if !self.types.contains(kind) {
            return false;
        }
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// Merge both listings into sorted, name-unique status rows.
///
/// Later rows win when a listing repeats a name. `installed` is empty when installed-only units
/// were not requested; loaded units then carry no unit file state.
pub(crate) fn merge(
    filter: &UnitFilter,
    loaded: Vec<Unit>,
    installed: Vec<UnitFile>,
) -> Vec<UnitStatus> {
    let mut live: BTreeMap<String, Unit> = BTreeMap::new();
    for unit in loaded {
        if filter.accepts(&unit.name) {
            live.insert(unit.name.clone(), unit);
        }
    }

    let mut file_states: BTreeMap<String, String> = BTreeMap::new();
    for file in installed {
        let name = file.name();
        if filter.accepts(name) {
            file_states.insert(name.to_string(), file.state.to_lowercase());
        }
    }

    let names: BTreeSet<&String> = live.keys().chain(file_states.keys()).collect();

    names
        .into_iter()
        .map(|name| {
            let unit_file_state = file_states.get(name).filter(|s| !s.is_empty()).cloned();
            let is_masked = unit_file_state
                .as_deref()
                .is_some_and(|s| MASKED_STATES.contains(&s));
            let is_enabled = !is_masked
                && unit_file_state
                    .as_deref()
                    .is_some_and(|s| ENABLED_STATES.contains(&s));

            match live.get(name) {
                Some(unit) => UnitStatus {
                    name: name.clone(),
                    kind: unit.kind().to_string(),
                    description: unit.description.clone(),
                    active_state: unit.active_state.clone(),
                    sub_state: unit.sub_state.clone(),
                    unit_file_state,
                    load_state: Some(unit.load_state.clone()),
                    is_enabled,
                    is_masked,
                },
                None => UnitStatus {
                    name: name.clone(),
                    kind: util::kind_from_name(name).to_string(),
                    description: None,
                    active_state: ActiveState::Inactive,
                    sub_state: "dead".to_string(),
                    unit_file_state,
                    load_state: None,
                    is_enabled,
                    is_masked,
                },
            }
        })
        .collect()
}

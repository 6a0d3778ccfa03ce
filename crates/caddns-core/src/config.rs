//! Configuration document for caddns
//!
//! The document is a single JSON object on disk:
//!
//! ```json
//! {
//!   "apiKey": "...",
//!   "zoneId": "023e105f4ecef8ad9ca31a8372d0c353",
//!   "domains": ["home.example.com"],
//!   "possible": ["example.com", "home.example.com", "vpn.example.com"]
//! }
//! ```
//!
//! Every field is optional and an absent file means `{}`. Keys this crate
//! does not know about are carried through rewrites untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// File name of the configuration document inside the home directory
pub const CONFIG_FILE_NAME: &str = ".ca-ddns.json";

/// File name of the agent launcher inside the home directory
#[cfg(windows)]
pub const AGENT_FILE_NAME: &str = "caddns-agent.cmd";

/// File name of the agent launcher inside the home directory
#[cfg(not(windows))]
pub const AGENT_FILE_NAME: &str = "caddns-agent.sh";

/// The persisted configuration document
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Provider API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Cached zone identifier, resolved once from the zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Managed set, ordered and free of duplicates
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub domains: Vec<String>,

    /// A-record names seen at the last discovery (advisory)
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub possible: Vec<String>,

    /// Unknown top-level keys, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("zone_id", &self.zone_id)
            .field("domains", &self.domains)
            .field("possible", &self.possible)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Config {
    /// The API key, or a configuration error if none has been saved
    pub fn require_api_key(&self) -> Result<&str, crate::Error> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(crate::Error::config(
                "No API key configured. Run `caddns init --api-key <KEY>` first",
            )),
        }
    }

    /// The cached zone id, or a configuration error if discovery never ran
    pub fn require_zone_id(&self) -> Result<&str, crate::Error> {
        match self.zone_id.as_deref() {
            Some(zone) if !zone.trim().is_empty() => Ok(zone),
            _ => Err(crate::Error::config(
                "No zone configured. Run `caddns discover --zone <NAME>` first",
            )),
        }
    }

    /// Apply a patch in the given mode and return the resulting document
    ///
    /// `MergeFields` overwrites exactly the fields present in the patch.
    /// `ReplaceDomains` only touches `domains`, replacing it wholesale.
    pub fn apply(mut self, patch: ConfigPatch, mode: SaveMode) -> Self {
        match mode {
            SaveMode::MergeFields => {
                if let Some(api_key) = patch.api_key {
                    self.api_key = Some(api_key);
                }
                if let Some(zone_id) = patch.zone_id {
                    self.zone_id = Some(zone_id);
                }
                if let Some(domains) = patch.domains {
                    self.domains = domains;
                }
                if let Some(possible) = patch.possible {
                    self.possible = possible;
                }
            }
            SaveMode::ReplaceDomains => {
                self.domains = patch.domains.unwrap_or_default();
            }
        }
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// How [`ConfigStore::save`](crate::traits::ConfigStore::save) combines a patch
/// with the stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Shallow merge of the fields present in the patch
    MergeFields,
    /// Replace the managed domain set, leave everything else alone
    ReplaceDomains,
}

/// Partial update of the configuration document
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub api_key: Option<String>,
    pub zone_id: Option<String>,
    pub domains: Option<Vec<String>>,
    pub possible: Option<Vec<String>>,
}

impl std::fmt::Debug for ConfigPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigPatch")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("zone_id", &self.zone_id)
            .field("domains", &self.domains)
            .field("possible", &self.possible)
            .finish()
    }
}

impl ConfigPatch {
    /// Patch that sets the API key
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Patch that sets the zone id
    pub fn zone_id(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: Some(zone_id.into()),
            ..Self::default()
        }
    }

    /// Patch that sets the managed domain set
    pub fn domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: Some(normalize_domains(domains)),
            ..Self::default()
        }
    }

    /// Patch that sets the managed domain set from nested groups
    ///
    /// The groups are flattened in order into a single set.
    pub fn domain_groups<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator,
        G::Item: AsRef<str>,
    {
        Self::domains(groups.into_iter().flatten().collect::<Vec<_>>())
    }

    /// Patch that sets the discovered record names
    pub fn possible<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            possible: Some(normalize_domains(names)),
            ..Self::default()
        }
    }
}

/// Normalize a domain name for comparison and storage
///
/// Trims whitespace, strips a trailing root dot and lowercases.
pub fn normalize_domain(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Normalize a sequence of names into an ordered set
///
/// First occurrence wins; blanks are dropped.
pub fn normalize_domains<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = normalize_domain(name.as_ref());
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// The current user's home directory
pub fn home_dir() -> Result<PathBuf, crate::Error> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| crate::Error::config(format!("{} is not set", var)))
}

/// Default location of the configuration document
pub fn default_config_path() -> Result<PathBuf, crate::Error> {
    Ok(home_dir()?.join(CONFIG_FILE_NAME))
}

/// Default location of the agent launcher
pub fn default_agent_path() -> Result<PathBuf, crate::Error> {
    Ok(home_dir()?.join(AGENT_FILE_NAME))
}

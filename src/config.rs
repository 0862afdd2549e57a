use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::model::ConfigError;

/// Static synonym configuration. Loaded once at startup; the tables built
/// from it are read-only afterwards, so they can be shared across any number
/// of concurrent analytics calls without locking.
#[derive(Debug, Clone, Deserialize)]
pub struct SynonymConfig {
    /// canonical model id -> free-text spellings
    pub model_synonyms: HashMap<String, Vec<String>>,
    /// canonical storage id -> free-text spellings
    pub storage_synonyms: HashMap<String, Vec<String>>,
    /// tier key ("s".."c") -> free-text condition descriptions
    pub condition_synonyms: HashMap<String, Vec<String>>,
    /// tier key -> disjoint group of canonical condition labels
    pub condition_groups: HashMap<String, Vec<String>>,
    /// platform allow-list for the per-platform breakdown; empty = no restriction
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Korean -> Latin replacements applied before keyword matching
    #[serde(default)]
    pub keyword_pairs: Vec<(String, String)>,
    /// titles containing any of these are dropped (accessory/trade listings)
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

const BUILTIN_CONFIG: &str = include_str!("../config.json");

impl SynonymConfig {
    /// The configuration shipped with the crate.
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_CONFIG).expect("builtin config.json must parse")
    }
}

pub fn load_config(path: &str) -> Result<SynonymConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SynonymConfig = serde_json::from_str(&content)?;
    Ok(config)
}

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::warn;
use serde::Deserialize;

/// Curated UI fields for one dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictEntry {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) short_description: String,
    #[serde(default)]
    pub(crate) language_tag: String,
}

/// Side-file mapping of dictionary id to curated UI fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DictMetadata {
    entries: HashMap<String, DictEntry>,
}

impl DictMetadata {
    /// Load the side file. A missing file is an empty mapping; an unreadable
    /// or malformed one is logged and also treated as empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!("metadata: could not read {}: {err}", path.display());
                return Self::default();
            }
        };

        Self::from_json_str(&raw).unwrap_or_else(|err| {
            warn!("metadata: could not parse {}: {err}", path.display());
            Self::default()
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, id: &str) -> Option<&DictEntry> {
        self.entries.get(id)
    }

    #[allow(unused)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

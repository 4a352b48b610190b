use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Item;

/// Schema version written into every manifest this tool produces.
pub const SCHEMA_VERSION: u32 = 1;

/// Top-level manifest document persisted for one asset kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_schema_version", deserialize_with = "lenient_schema_version")]
    pub(crate) schema_version: u32,

    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) generated_at: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub(crate) release_tag: String,

    #[serde(default, deserialize_with = "lenient_items")]
    pub(crate) items: Vec<Item>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

// The header is rewritten on every run, so an odd value there must not cost
// the items below it.
fn lenient_schema_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(SCHEMA_VERSION))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Items are converted one by one; an entry without a string `id` cannot be
/// keyed and is dropped with a warning instead of failing the document.
fn lenient_items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Item>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

    let items = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Item>(value) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("manifest: skipping item #{index}: {err}");
                None
            }
        })
        .collect();
    Ok(items)
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: String::new(),
            release_tag: String::new(),
            items: Vec::new(),
        }
    }
}

#[allow(unused)]
impl Manifest {
    pub fn new(generated_at: String, release_tag: String, items: Vec<Item>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at,
            release_tag,
            items,
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn generated_at(&self) -> &str {
        &self.generated_at
    }

    pub fn release_tag(&self) -> &str {
        &self.release_tag
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Find an item by its stable id.
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }
}

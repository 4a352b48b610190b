use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

const ID: &str = "id";
const FILENAME: &str = "filename";
const URL: &str = "url";
const BYTES: &str = "bytes";
const SHA256: &str = "sha256";
const UPDATED_AT: &str = "updatedAt";

/// UI-facing keys refreshed by the metadata policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiField {
    Name,
    ShortDescription,
    LanguageTag,
}

impl UiField {
    pub fn key(&self) -> &'static str {
        match self {
            UiField::Name => "name",
            UiField::ShortDescription => "shortDescription",
            UiField::LanguageTag => "languageTag",
        }
    }
}

/// One manifest entry: a single logical asset tracked across releases.
///
/// The entry is held as the JSON object it was read from, keys in file order,
/// so an item nobody touches is written back exactly as it was loaded. Only
/// `id` is required to be a string; every other key is read leniently.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    fields: Map<String, Value>,
}

#[derive(thiserror::Error, Debug)]
#[error("manifest item has no string `id`")]
pub struct MissingId;

#[allow(unused)]
impl Item {
    /// Fresh item for an asset seen for the first time. Technical and UI
    /// fields are filled in by the reconciliation pass.
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ID.into(), Value::String(id.into()));
        fields.insert(FILENAME.into(), Value::String(filename.into()));
        fields.insert(URL.into(), Value::String(String::new()));
        fields.insert(BYTES.into(), Value::from(0u64));
        fields.insert(SHA256.into(), Value::String(String::new()));
        fields.insert(UPDATED_AT.into(), Value::String(String::new()));
        Self { fields }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, MissingId> {
        match fields.get(ID) {
            Some(Value::String(_)) => Ok(Self { fields }),
            _ => Err(MissingId),
        }
    }

    pub fn id(&self) -> &str {
        self.str_field(ID).unwrap_or_default()
    }

    pub fn filename(&self) -> Option<&str> {
        self.str_field(FILENAME)
    }

    pub fn url(&self) -> &str {
        self.str_field(URL).unwrap_or_default()
    }

    pub fn bytes(&self) -> u64 {
        self.fields.get(BYTES).and_then(Value::as_u64).unwrap_or_default()
    }

    pub fn sha256(&self) -> &str {
        self.str_field(SHA256).unwrap_or_default()
    }

    pub fn updated_at(&self) -> &str {
        self.str_field(UPDATED_AT).unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field(UiField::Name.key())
    }

    pub fn short_description(&self) -> Option<&str> {
        self.str_field(UiField::ShortDescription.key())
    }

    pub fn language_tag(&self) -> Option<&str> {
        self.str_field(UiField::LanguageTag.key())
    }

    /// Raw value of a UI field, whatever its JSON type.
    pub fn ui(&self, field: UiField) -> Option<&Value> {
        self.fields.get(field.key())
    }

    pub fn has_ui(&self, field: UiField) -> bool {
        self.fields.contains_key(field.key())
    }

    /// Absent, `null` and `""` all count as blank.
    pub fn ui_is_blank(&self, field: UiField) -> bool {
        match self.ui(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    pub fn set_ui(&mut self, field: UiField, value: impl Into<Value>) {
        self.set(field.key(), value.into());
    }

    pub fn set_filename(&mut self, filename: &str) {
        self.set(FILENAME, Value::String(filename.to_string()));
    }

    pub fn set_url(&mut self, url: &str) {
        self.set(URL, Value::String(url.to_string()));
    }

    pub fn set_bytes(&mut self, bytes: u64) {
        self.set(BYTES, Value::from(bytes));
    }

    pub fn set_sha256(&mut self, sha256: String) {
        self.set(SHA256, Value::String(sha256));
    }

    pub fn set_updated_at(&mut self, stamp: &str) {
        self.set(UPDATED_AT, Value::String(stamp.to_string()));
    }

    // Replacing an existing key keeps its position; new keys go last.
    fn set(&mut self, key: &str, value: Value) {
        match self.fields.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(key.to_string(), value);
            }
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Item::from_fields(fields).map_err(de::Error::custom)
    }
}

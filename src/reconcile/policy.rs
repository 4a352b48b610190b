use log::warn;
use serde_json::Value;

use super::identity::readable_name;
use crate::manifest::{AssetKind, DictMetadata, Item, UiField};

/// How the UI-facing fields of an item are refreshed.
#[derive(Debug, Clone, Copy)]
pub enum MetadataPolicy<'a> {
    /// Name and description come from the layout file itself.
    Layout,
    /// Name, description and language come from the curated side file.
    Dictionary(&'a DictMetadata),
}

impl MetadataPolicy<'_> {
    pub fn kind(&self) -> AssetKind {
        match self {
            MetadataPolicy::Layout => AssetKind::Layout,
            MetadataPolicy::Dictionary(_) => AssetKind::Dictionary,
        }
    }

    /// Update `item` from the downloaded `body`. `is_new` is true when the
    /// item did not exist in the previous manifest.
    ///
    /// Returns true when a new dictionary has no curated metadata entry.
    pub fn apply(&self, item: &mut Item, body: &[u8], is_new: bool) -> bool {
        match self {
            MetadataPolicy::Layout => {
                apply_layout(item, body);
                false
            }
            MetadataPolicy::Dictionary(metadata) => apply_dictionary(item, metadata, is_new),
        }
    }
}

/// `name` and the first line of `description` from a layout document.
///
/// `name` is carried over with whatever JSON type it has. A description that
/// is not a string reads as empty.
pub fn layout_summary(body: &[u8]) -> Result<(Value, String), serde_json::Error> {
    let doc: Value = serde_json::from_slice(body)?;

    let name = doc.get("name").cloned().unwrap_or_else(|| Value::from(""));
    let description = match doc.get("description") {
        Some(Value::String(d)) => d.split('\n').next().unwrap_or_default().trim().to_string(),
        None | Some(Value::Null) => String::new(),
        Some(other) => {
            warn!("layout: ignoring non-string description {other}");
            String::new()
        }
    };

    Ok((name, description))
}

fn apply_layout(item: &mut Item, body: &[u8]) {
    let (name, description) = layout_summary(body).unwrap_or_else(|err| {
        warn!("layout: could not parse metadata for '{}': {err}", item.id());
        (Value::from(""), String::new())
    });
    if !name.is_string() {
        warn!("layout: '{}' has a non-string name {name}, keeping it as is", item.id());
    }

    item.set_ui(UiField::Name, name);
    item.set_ui(UiField::ShortDescription, description);
    if !item.has_ui(UiField::LanguageTag) {
        item.set_ui(UiField::LanguageTag, "");
    }
}

fn apply_dictionary(item: &mut Item, metadata: &DictMetadata, is_new: bool) -> bool {
    if let Some(entry) = metadata.get(item.id()) {
        item.set_ui(UiField::Name, entry.name.clone());
        item.set_ui(UiField::ShortDescription, entry.short_description.clone());
        item.set_ui(UiField::LanguageTag, entry.language_tag.clone());
        return false;
    }

    if item.ui_is_blank(UiField::Name) {
        let name = readable_name(item.id());
        item.set_ui(UiField::Name, name);
    }
    for field in [UiField::ShortDescription, UiField::LanguageTag] {
        if item.ui_is_blank(field) {
            item.set_ui(field, "");
        }
    }

    if is_new {
        warn!(
            "metadata: missing entry for dictionary '{}', add it to the dictionary metadata file",
            item.id()
        );
    }
    is_new
}

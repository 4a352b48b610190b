mod document;
mod item;
mod kind;
mod metadata;
mod store;

pub use document::Manifest;
pub use item::{Item, UiField};
pub use kind::AssetKind;
pub use metadata::DictMetadata;
pub use store::{load_manifest, parse_manifest, render_manifest, save_manifest};

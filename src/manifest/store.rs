use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::Manifest;

/// Content left in a manifest file that has never been generated.
const PLACEHOLDER: &str = "hello world";

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}

/// Read the manifest at `path`.
///
/// Never fails: a missing, empty, placeholder or malformed file yields an
/// empty manifest so the next run can regenerate it.
pub fn load_manifest(path: impl AsRef<Path>) -> Manifest {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("manifest: {} does not exist yet", path.display());
            return Manifest::default();
        }
        Err(err) => {
            warn!("manifest: could not read {}: {err}", path.display());
            return Manifest::default();
        }
    };

    parse_manifest(&raw).unwrap_or_else(|err| {
        warn!("manifest: ignoring malformed {}: {err}", path.display());
        Manifest::default()
    })
}

/// Parse manifest text, mapping blank and placeholder content to an empty
/// manifest.
pub fn parse_manifest(raw: &str) -> Result<Manifest, serde_json::Error> {
    let content = raw.trim();
    if content.is_empty() || content == PLACEHOLDER {
        return Ok(Manifest::default());
    }
    serde_json::from_str(content)
}

/// Render the manifest as 2-space indented JSON with non-ASCII left as is.
pub fn render_manifest(manifest: &Manifest) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

/// Write the manifest, creating parent directories as needed.
///
/// Writes to a sibling `.tmp` file first, then renames over `path`.
pub fn save_manifest(path: impl AsRef<Path>, manifest: &Manifest) -> Result<(), ManifestError> {
    let path = path.as_ref();
    let json = render_manifest(manifest)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
    file.write_all(json.as_bytes()).map_err(|e| io_err(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

use serde::Deserialize;

/// The subset of the GitHub release payload this tool reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub(crate) tag_name: String,
    #[serde(default)]
    pub(crate) assets: Vec<ReleaseAsset>,
}

#[allow(unused)]
impl Release {
    pub fn new(tag_name: impl Into<String>, assets: Vec<ReleaseAsset>) -> Self {
        Self {
            tag_name: tag_name.into(),
            assets,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn assets(&self) -> &[ReleaseAsset] {
        &self.assets
    }
}

/// A file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    #[serde(rename = "name")]
    pub(crate) filename: String,
    pub(crate) browser_download_url: String,
    #[serde(default)]
    pub(crate) size: u64,
}

#[allow(unused)]
impl ReleaseAsset {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            browser_download_url: url.into(),
            size,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn url(&self) -> &str {
        &self.browser_download_url
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

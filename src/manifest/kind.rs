use std::fmt;

/// The two asset families published in a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Dictionary,
    Layout,
}

impl AssetKind {
    /// Filename suffix that routes an asset to this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Dictionary => ".dict",
            AssetKind::Layout => ".json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Dictionary => "dictionary",
            AssetKind::Layout => "layout",
        }
    }

    pub fn matches(&self, filename: &str) -> bool {
        filename.ends_with(self.extension())
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

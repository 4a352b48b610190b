use regex::Regex;

use super::Release;

/// Glob-style release tag filter where `*` matches any run of characters.
///
/// Every other character is literal and the whole tag must match, so `v1.*`
/// accepts `v1.2.0` but not `v10` or `xv1.0`.
#[derive(Debug, Clone)]
pub struct TagPattern {
    glob: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(glob: &str) -> Result<Self, regex::Error> {
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }

    /// First release in listing order whose tag matches.
    ///
    /// The GitHub API lists newest first; this relies on that ordering rather
    /// than comparing dates or versions.
    pub fn first_match<I>(&self, releases: I) -> Option<Release>
    where
        I: IntoIterator<Item = Release>,
    {
        releases.into_iter().find(|r| self.matches(r.tag_name()))
    }
}

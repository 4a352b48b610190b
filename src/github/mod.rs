mod models;
mod pattern;

pub use models::{Release, ReleaseAsset};
pub use pattern::TagPattern;

use std::fmt;

use log::{debug, info};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const USER_AGENT: &str = concat!("release-manifest-sync/", env!("CARGO_PKG_VERSION"));

const API_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const PER_PAGE: usize = 100;

/// Connection settings for the GitHub REST API.
///
/// The token is passed in explicitly; nothing here reads the environment.
#[derive(Clone)]
pub struct GithubConfig {
    api_base: Url,
    token: Option<String>,
}

impl GithubConfig {
    pub fn new(api_base: Url, token: Option<String>) -> Self {
        // An empty GITHUB_TOKEN is the same as none.
        let token = token.filter(|t| !t.trim().is_empty());
        Self { api_base, token }
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_base", &self.api_base.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How the release to synchronize against is chosen.
#[derive(Debug, Clone)]
pub enum ReleaseSelector {
    Tag(String),
    Pattern(TagPattern),
    Latest,
}

impl ReleaseSelector {
    /// An explicit tag wins; otherwise a pattern; otherwise the latest release.
    pub fn from_args(tag: Option<String>, pattern: Option<&str>) -> Result<Self, ReleaseError> {
        if let Some(tag) = tag {
            return Ok(Self::Tag(tag));
        }
        if let Some(glob) = pattern {
            return Ok(Self::Pattern(TagPattern::new(glob)?));
        }
        Ok(Self::Latest)
    }
}

impl fmt::Display for ReleaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseSelector::Tag(tag) => write!(f, "tag '{tag}'"),
            ReleaseSelector::Pattern(p) => write!(f, "pattern '{}'", p.as_str()),
            ReleaseSelector::Latest => f.write_str("latest release"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReleaseError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GitHub API returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("no release found matching pattern: {0}")]
    NoMatchingRelease(String),
    #[error("invalid tag pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("API URL cannot carry a path: {0}")]
    InvalidApiUrl(String),
}

/// Thin client over the release endpoints of one repository.
pub struct GithubClient {
    http: Client,
    config: GithubConfig,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(config: GithubConfig, owner: &str, repo: &str) -> Result<Self, ReleaseError> {
        debug!(
            "release: using {} ({})",
            config.api_base(),
            if config.has_token() { "authenticated" } else { "anonymous" }
        );

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ReleaseError::Client)?;

        Ok(Self {
            http,
            config,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Resolve the selector to a concrete release with its asset list.
    pub async fn resolve(&self, selector: &ReleaseSelector) -> Result<Release, ReleaseError> {
        let release: Release = match selector {
            ReleaseSelector::Tag(tag) => {
                let url = self.endpoint(&["releases", "tags", tag.as_str()])?;
                self.get_json(url).await?
            }
            ReleaseSelector::Pattern(pattern) => self.first_matching(pattern).await?,
            ReleaseSelector::Latest => {
                let url = self.endpoint(&["releases", "latest"])?;
                self.get_json(url).await?
            }
        };

        info!(
            "release: resolved {selector} to {} ({} assets)",
            release.tag_name(),
            release.assets().len()
        );
        Ok(release)
    }

    /// Walk the paginated release listing until a tag matches.
    async fn first_matching(&self, pattern: &TagPattern) -> Result<Release, ReleaseError> {
        let mut page = 1usize;
        loop {
            let mut url = self.endpoint(&["releases"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let releases: Vec<Release> = self.get_json(url).await?;
            let fetched = releases.len();
            debug!("release: page {page} listed {fetched} releases");

            if let Some(found) = pattern.first_match(releases) {
                return Ok(found);
            }
            if fetched < PER_PAGE {
                return Err(ReleaseError::NoMatchingRelease(pattern.as_str().to_string()));
            }
            page += 1;
        }
    }

    fn endpoint(&self, tail: &[&str]) -> Result<Url, ReleaseError> {
        repo_endpoint(self.config.api_base(), &self.owner, &self.repo, tail)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ReleaseError> {
        let mut request = self.http.get(url.clone()).header(ACCEPT, API_MEDIA_TYPE);
        if let Some(token) = &self.config.token {
            request = request.basic_auth("", Some(token));
        }

        let response = request.send().await.map_err(|source| ReleaseError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json::<T>().await.map_err(|source| ReleaseError::Http {
            url: url.to_string(),
            source,
        })
    }
}

/// `{api_base}/repos/{owner}/{repo}/{tail...}` with every segment escaped.
fn repo_endpoint(base: &Url, owner: &str, repo: &str, tail: &[&str]) -> Result<Url, ReleaseError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ReleaseError::InvalidApiUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["repos", owner, repo])
        .extend(tail);
    Ok(url)
}

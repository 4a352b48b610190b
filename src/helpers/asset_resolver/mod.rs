use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use reqwest::Client;

use super::{AssetFetcher, FetchError};
use crate::github::USER_AGENT;

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOC: u64 = 64 << 20;

/// Downloads release assets over HTTP, showing progress on stderr.
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("download: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    fn progress_bar(url: &str, total: Option<u64>) -> ProgressBar {
        let filename = url.rsplit('/').find(|s| !s.is_empty()).unwrap_or(url);

        let pb = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} {spinner:.green} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(filename.to_string());
        pb
    }
}

#[async_trait::async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let mut res = self.client.get(url).send().await.map_err(http_err)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let total = res.content_length();
        let pb = Self::progress_bar(url, total);
        let mut body = Vec::with_capacity(initial_capacity(total));

        while let Some(chunk) = res.chunk().await.map_err(http_err)? {
            body.extend_from_slice(&chunk);
            pb.set_position(body.len() as u64);
        }

        pb.finish_and_clear();
        Ok(body)
    }
}

fn initial_capacity(content_length: Option<u64>) -> usize {
    let reserve = content_length.unwrap_or_default().min(MAX_PREALLOC);
    usize::try_from(reserve).unwrap_or_default()
}

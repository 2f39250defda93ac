//! Client for the content host: one recursive tree listing, then one
//! raw download per file.

use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::{CollectionConfig, RemoteConfig};
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("repo-notes/", env!("CARGO_PKG_VERSION"));
const TREE_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[serde(alias = "file")]
    Blob,
    Tree,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Option<Vec<TreeItem>>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub body: String,
}

/// Result of downloading a batch of files; failed paths are kept so the
/// caller can report partial loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchBatch {
    pub files: Vec<FetchedFile>,
    pub failed: Vec<String>,
}

/// Keeps files of `collection`, in listing order.
pub fn filter_items<'a>(items: &'a [TreeItem], collection: &CollectionConfig) -> Vec<&'a TreeItem> {
    items
        .iter()
        .filter(|item| item.kind == ItemKind::Blob && collection.matches(&item.path))
        .collect()
}

#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: Client,
    api_base: String,
    raw_base: String,
    repository: String,
    branch: String,
    credential: Option<String>,
    concurrency: usize,
}

impl RemoteSource {
    pub fn new(config: &RemoteConfig, credential: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
            credential: credential.filter(|c| !c.trim().is_empty()),
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/git/trees/{}?recursive=1",
            self.api_base, self.repository, self.branch
        )
    }

    /// Raw download URL; every path segment is percent-encoded.
    pub fn raw_url(&self, path: &str) -> Result<Url> {
        let mut url =
            Url::parse(&self.raw_base).map_err(|e| Error::Url(format!("{}: {e}", self.raw_base)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Url(format!("{} cannot be a base", self.raw_base)))?
            .pop_if_empty()
            .extend(self.repository.split('/'))
            .push(&self.branch)
            .extend(path.split('/'));
        Ok(url)
    }

    fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.credential {
            Some(token) => request.header("Authorization", format!("token {token}")),
            None => request,
        }
    }

    pub async fn try_fetch_tree(&self) -> Result<Vec<TreeItem>> {
        let url = self.tree_url();
        let response = self.get(&url).header("Accept", TREE_ACCEPT).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body: TreeResponse = response.json().await?;
        if body.truncated {
            warn!("tree listing for {} is truncated", self.repository);
        }
        match body.tree {
            Some(tree) => Ok(tree),
            None => {
                warn!("tree listing for {} has no tree array", self.repository);
                Ok(Vec::new())
            }
        }
    }

    /// The full recursive listing, or `None` after logging the failure.
    pub async fn fetch_tree(&self) -> Option<Vec<TreeItem>> {
        match self.try_fetch_tree().await {
            Ok(tree) => {
                debug!("listed {} items in {}", tree.len(), self.repository);
                Some(tree)
            }
            Err(e) => {
                error!("failed to fetch repository tree: {e}");
                None
            }
        }
    }

    pub async fn fetch_raw(&self, path: &str) -> Result<String> {
        let url = self.raw_url(path)?;
        let response = self.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Downloads every path with bounded parallelism. Results keep the
    /// order of `paths`; a failed download is logged and skipped.
    pub async fn fetch_contents(&self, paths: &[String]) -> FetchBatch {
        let results: Vec<(String, Result<String>)> = stream::iter(paths.iter().cloned())
            .map(|path| async move {
                let body = self.fetch_raw(&path).await;
                (path, body)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut batch = FetchBatch::default();
        for (path, body) in results {
            match body {
                Ok(body) => batch.files.push(FetchedFile { path, body }),
                Err(e) => {
                    warn!("failed to fetch raw content for {path}: {e}");
                    batch.failed.push(path);
                }
            }
        }
        info!(
            "fetched {} of {} files from {}",
            batch.files.len(),
            paths.len(),
            self.repository
        );
        batch
    }
}

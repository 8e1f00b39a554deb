// Local mirroring of remote images. A file's presence on disk is the whole
// cache: once `<root>/<folder>/<key>.<ext>` exists it is served as-is.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{MediaError, Result};
use crate::fetcher::{FetchRequest, MediaFetcher};

/// Public URL prefix under which the media root is served.
pub const MEDIA_URL_PREFIX: &str = "/media";

const DEFAULT_EXTENSION: &str = "jpg";
const MIRROR_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFolder {
    Accounts,
    Posts,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::Accounts => "accounts",
            MediaFolder::Posts => "posts",
        }
    }
}

impl fmt::Display for MediaFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable logical file name, `<entity>_<id>`.
///
/// Keys never come from request input, so they cannot escape the folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorKey(String);

impl MirrorKey {
    pub fn new(entity: &'static str, id: i64) -> Self {
        Self(format!("{entity}_{id}"))
    }

    pub fn account(id: i32) -> Self {
        Self::new("account", id.into())
    }

    pub fn post(id: i32) -> Self {
        Self::new("post", id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MirrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a best-effort mirror: either the local public path or the
/// original URL together with why mirroring did not happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Mirrored(String),
    Fallback { original: String, reason: String },
}

/// File extension for a mirrored copy of `url`, taken from the last path
/// segment. Only common image types are kept; everything else is `jpg`.
pub fn extension_from_url(url: &str) -> &'static str {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = segment.rsplit_once('.') else {
        return DEFAULT_EXTENSION;
    };

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => DEFAULT_EXTENSION,
    }
}

fn referer_for(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| MediaError::InvalidUrl(format!("{url}: {e}")))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(MediaError::InvalidUrl(format!("{url}: no origin")));
    }
    Ok(origin.ascii_serialization())
}

/// Mirrors remote images into a local media root.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
    fetcher: Arc<dyn MediaFetcher>,
    timeout: Duration,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure a local copy of `url` exists and return its public path.
    ///
    /// An existing file short-circuits without touching the network, no
    /// matter how old it is or what `url` currently points at.
    pub async fn mirror(&self, url: &str, folder: MediaFolder, key: &MirrorKey) -> Result<String> {
        let dir = self.root.join(folder.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{key}.{}", extension_from_url(url));
        let path = dir.join(&file_name);
        let public_path = format!("{MEDIA_URL_PREFIX}/{folder}/{file_name}");

        if tokio::fs::try_exists(&path).await? {
            debug!(%key, path = %path.display(), "media: cache hit");
            return Ok(public_path);
        }

        let request = FetchRequest::new(url, self.timeout)
            .header("user-agent", MIRROR_USER_AGENT)
            .header("accept", "image/*")
            .header("referer", referer_for(url)?);

        let fetched = self.fetcher.fetch(request).await?;
        if !fetched.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: fetched.status,
            });
        }

        tokio::fs::write(&path, &fetched.body).await?;
        info!(%key, path = %path.display(), bytes = fetched.body.len(), "media: mirrored");

        Ok(public_path)
    }

    /// Like [`MediaStore::mirror`], but failures degrade to the original URL.
    pub async fn mirror_or_fallback(
        &self,
        url: &str,
        folder: MediaFolder,
        key: &MirrorKey,
    ) -> MirrorOutcome {
        match self.mirror(url, folder, key).await {
            Ok(path) => MirrorOutcome::Mirrored(path),
            Err(e) => {
                warn!(%key, url, error = %e, "media: mirror failed, keeping remote url");
                MirrorOutcome::Fallback {
                    original: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

// Response-time rewriting of remote image URLs into mirrored, absolute
// local URLs. Nothing is persisted; a failed mirror leaves the remote URL.

use axum::http::HeaderMap;
use futures::future::join_all;
use moodwatch_domains::{Account, Post};
use moodwatch_media::{MediaFolder, MediaStore, MirrorKey, MirrorOutcome};

/// Scheme and host the client used to reach us, honouring proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let scheme = first_value(headers, "x-forwarded-proto").unwrap_or_else(|| "http".to_string());
        let host = first_value(headers, "x-forwarded-host")
            .or_else(|| first_value(headers, "host"))
            .unwrap_or_else(|| "localhost".to_string());
        Self { scheme, host }
    }

    pub fn absolute(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

/// First comma-separated entry of a header, if present and non-empty.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A record carrying one remote image worth mirroring.
pub trait Mirrorable {
    const FOLDER: MediaFolder;

    fn mirror_key(&self) -> MirrorKey;
    fn image_url(&self) -> Option<&str>;
    fn set_image_url(&mut self, url: String);
}

impl Mirrorable for Account {
    const FOLDER: MediaFolder = MediaFolder::Accounts;

    fn mirror_key(&self) -> MirrorKey {
        MirrorKey::account(self.id)
    }

    fn image_url(&self) -> Option<&str> {
        self.profile_pic_url.as_deref()
    }

    fn set_image_url(&mut self, url: String) {
        self.profile_pic_url = Some(url);
    }
}

impl Mirrorable for Post {
    const FOLDER: MediaFolder = MediaFolder::Posts;

    fn mirror_key(&self) -> MirrorKey {
        MirrorKey::post(self.id)
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    fn set_image_url(&mut self, url: String) {
        self.image_url = Some(url);
    }
}

pub async fn enrich<T: Mirrorable>(media: &MediaStore, origin: &RequestOrigin, mut record: T) -> T {
    let Some(url) = record
        .image_url()
        .filter(|url| url.starts_with("http"))
        .map(str::to_string)
    else {
        return record;
    };

    // Fallbacks are logged by the store; the remote URL simply stays.
    if let MirrorOutcome::Mirrored(path) = media
        .mirror_or_fallback(&url, T::FOLDER, &record.mirror_key())
        .await
    {
        record.set_image_url(origin.absolute(&path));
    }
    record
}

/// Enrich every record concurrently, preserving order.
pub async fn enrich_all<T: Mirrorable>(
    media: &MediaStore,
    origin: &RequestOrigin,
    records: Vec<T>,
) -> Vec<T> {
    join_all(records.into_iter().map(|record| enrich(media, origin, record))).await
}

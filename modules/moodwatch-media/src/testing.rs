//! In-process fetchers for tests. No network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{MediaError, Result};
use crate::fetcher::{FetchRequest, FetchedMedia, MediaFetcher};

enum Reply {
    Media(FetchedMedia),
    Fail(String),
}

/// Returns a canned reply and records every request it receives.
pub struct StubFetcher {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubFetcher {
    pub fn ok(content_type: &str, body: &'static [u8]) -> Self {
        Self::with_reply(Reply::Media(FetchedMedia {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: Bytes::from_static(body),
        }))
    }

    pub fn status(status: u16) -> Self {
        Self::with_reply(Reply::Media(FetchedMedia {
            status,
            content_type: Some("text/html".to_string()),
            body: Bytes::from_static(b"<html>nope</html>"),
        }))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Reply::Media(media) => Ok(media.clone()),
            Reply::Fail(message) => Err(MediaError::FetchFailed(message.clone())),
        }
    }
}

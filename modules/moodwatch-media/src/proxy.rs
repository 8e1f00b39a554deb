// Image relay for the dashboard. Accepts either a remote URL or an inline
// base64 payload and always produces an image: upstream failures are
// replaced by a 1x1 transparent PNG.

use std::sync::Arc;
use std::time::Duration;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};
use crate::fetcher::{FetchRequest, MediaFetcher};

/// Served whenever the upstream image cannot be fetched.
pub const PLACEHOLDER_PNG: &[u8] = include_bytes!("../assets/placeholder.png");

pub const CACHE_FOR_A_DAY: &str = "public, max-age=86400";

/// Inputs longer than this are assumed to be base64 rather than a URL.
const INLINE_LENGTH_THRESHOLD: usize = 1000;
const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";

const INSTAGRAM_REFERER: &str = "https://www.instagram.com/";
const INSTAGRAM_ORIGIN: &str = "https://www.instagram.com";
/// Query parameters Instagram's CDN still honours once the expiring
/// signature parameters are dropped.
const KEPT_CDN_PARAMS: [&str; 6] = ["stp", "efg", "_nc_ht", "_nc_cat", "oh", "oe"];

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyInput<'a> {
    Inline(&'a str),
    Remote(&'a str),
}

impl<'a> ProxyInput<'a> {
    /// Heuristic split between inline payloads and URLs: JPEG/PNG base64
    /// magic, a data URI, or anything too long to be a sensible URL.
    pub fn classify(input: &'a str) -> Self {
        if input.starts_with("/9j/")
            || input.starts_with("iVBORw0KGgo")
            || input.starts_with("data:image/")
            || input.len() > INLINE_LENGTH_THRESHOLD
        {
            ProxyInput::Inline(input)
        } else {
            ProxyInput::Remote(input)
        }
    }
}

/// Bytes ready to relay to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedImage {
    pub content_type: String,
    pub body: Bytes,
    /// Set only for successfully relayed upstream images.
    pub cache_control: Option<&'static str>,
}

impl ProxiedImage {
    pub fn placeholder() -> Self {
        Self {
            content_type: "image/png".to_string(),
            body: Bytes::from_static(PLACEHOLDER_PNG),
            cache_control: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.body.as_ref() == PLACEHOLDER_PNG && self.content_type == "image/png"
    }
}

#[derive(Clone)]
pub struct ImageProxy {
    fetcher: Arc<dyn MediaFetcher>,
    timeout: Duration,
}

impl ImageProxy {
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_PROXY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve `input` to image bytes. Never fails.
    pub async fn proxy(&self, input: &str) -> ProxiedImage {
        match ProxyInput::classify(input) {
            ProxyInput::Inline(payload) => Self::inline(payload),
            ProxyInput::Remote(url) => self.remote(url).await,
        }
    }

    /// Decode an inline payload without touching the network.
    pub fn inline(payload: &str) -> ProxiedImage {
        decode_inline(payload)
    }

    /// Relay `url` exactly as given, or the placeholder on any failure.
    pub async fn remote(&self, url: &str) -> ProxiedImage {
        match self.fetch_remote(url).await {
            Ok(image) => image,
            Err(e) => {
                warn!(url, error = %e, "proxy: upstream fetch failed, serving placeholder");
                ProxiedImage::placeholder()
            }
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<ProxiedImage> {
        let meta_cdn = is_meta_cdn(url);
        let target = if meta_cdn {
            strip_signed_params(url)
        } else {
            url.to_string()
        };

        let mut request = FetchRequest::new(target, self.timeout)
            .header("user-agent", MOBILE_USER_AGENT)
            .header("accept", IMAGE_ACCEPT)
            .header("accept-language", "en-US,en;q=0.9");
        if meta_cdn {
            request = request
                .header("referer", INSTAGRAM_REFERER)
                .header("origin", INSTAGRAM_ORIGIN);
        }

        let fetched = self.fetcher.fetch(request).await?;
        if !(200..400).contains(&fetched.status) {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: fetched.status,
            });
        }

        debug!(url, status = fetched.status, bytes = fetched.body.len(), "proxy: relayed");

        Ok(ProxiedImage {
            content_type: fetched
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            body: fetched.body,
            cache_control: Some(CACHE_FOR_A_DAY),
        })
    }
}

fn is_meta_cdn(url: &str) -> bool {
    url.contains("instagram.") || url.contains("fbcdn.net")
}

/// Drop every query parameter except the CDN allow-list and `_nc_*`.
/// Unparseable URLs are returned untouched.
fn strip_signed_params(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| KEPT_CDN_PARAMS.contains(&key.as_ref()) || key.starts_with("_nc_"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.into()
}

/// Decode an inline payload. Malformed base64 yields whatever could be
/// salvaged; there is no error path.
fn decode_inline(input: &str) -> ProxiedImage {
    let content_type = match input.strip_prefix("data:image/") {
        Some(rest) if rest.starts_with("png") => "image/png",
        Some(rest) if rest.starts_with("gif") => "image/gif",
        Some(rest) if rest.starts_with("webp") => "image/webp",
        _ => DEFAULT_CONTENT_TYPE,
    };

    ProxiedImage {
        content_type: content_type.to_string(),
        body: Bytes::from(decode_lenient(data_uri_payload(input))),
        cache_control: None,
    }
}

/// The base64 part of `data:image/<subtype>;base64,<payload>`, or the whole
/// input when it is not a well-formed data URI.
fn data_uri_payload(input: &str) -> &str {
    let Some(rest) = input.strip_prefix("data:image/") else {
        return input;
    };
    match rest.split_once(";base64,") {
        Some((subtype, payload))
            if !subtype.is_empty()
                && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !payload.is_empty() =>
        {
            payload
        }
        _ => input,
    }
}

fn decode_lenient(payload: &str) -> Vec<u8> {
    // Query decoding turns '+' into ' '; url-safe symbols map onto the standard alphabet.
    let mut cleaned: String = payload
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_ascii_alphanumeric() || c == '+' || c == '/' => Some(c),
            _ => None,
        })
        .collect();

    // A lone trailing sextet cannot encode a byte.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT_BASE64.decode(cleaned.as_bytes()).unwrap_or_else(|e| {
        warn!(error = %e, "proxy: undecodable inline payload");
        Vec::new()
    })
}

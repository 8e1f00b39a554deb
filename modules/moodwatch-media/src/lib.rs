pub mod error;
pub mod fetcher;
pub mod mirror;
pub mod proxy;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{MediaError, Result};
pub use fetcher::{FetchRequest, FetchedMedia, HttpFetcher, MediaFetcher};
pub use mirror::{extension_from_url, MediaFolder, MediaStore, MirrorKey, MirrorOutcome};
pub use proxy::{ImageProxy, ProxiedImage, ProxyInput, PLACEHOLDER_PNG};

use moodwatch_media::{ImageProxy, MediaStore};
use sqlx::PgPool;

/// Shared handler state. Cheap to clone: every field is a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub media: MediaStore,
    pub proxy: ImageProxy,
}

pub mod accounts;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod params;
pub mod posts;

pub use accounts::Account;
pub use comments::report::{CategorySelector, DateRange, ReportFilters, ReportPage};
pub use comments::request::ReportRequest;
pub use comments::{Comment, MarkReadOutcome, ReportRow};
pub use error::ValidationError;
pub use pagination::{total_pages, PageMeta, Pagination};
pub use posts::{CreatePost, Post, UpdatePost};

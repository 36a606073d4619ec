// HTTP client for the remote posts endpoint
pub mod posts;
pub mod retry;

// Re-export common types
pub use posts::{ApiError, NewPost, Post, PostsClient, DEFAULT_BASE_URL};
pub use retry::RetryConfig;

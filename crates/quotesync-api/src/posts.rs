use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig};

/// JSONPlaceholder-style endpoint. It echoes writes back but never keeps them.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApiError {
    /// Client errors won't get better by asking again
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::ServerError { .. } | ApiError::RateLimitExceeded => true,
            ApiError::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::RequestFailed(_) | ApiError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// A post as the endpoint returns it.
///
/// Only `title` carries anything we care about, the rest is kept so the
/// record can be logged or echoed back without losing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Write shape for `POST /posts`. The field names are fixed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: u64,
}

pub struct PostsClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl PostsClient {
    /// Point the client somewhere other than the public placeholder server
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("QuoteSync/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /posts`
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let url = format!("{}/posts", self.base_url);

        with_retry(&self.retry_config, ApiError::is_retryable, || async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();

            if status == 429 {
                return Err(ApiError::RateLimitExceeded);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(status, body));
            }

            let text = response.text().await?;
            let posts: Vec<Post> = serde_json::from_str(&text)?;
            debug!("Fetched {} posts from {}", posts.len(), url);
            Ok(posts)
        })
        .await
    }

    /// `POST /posts` - returns whatever the server echoes back
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let url = format!("{}/posts", self.base_url);

        with_retry(&self.retry_config, ApiError::is_retryable, || async {
            let response = self.client.post(&url).json(post).send().await?;
            let status = response.status();

            if status == 429 {
                return Err(ApiError::RateLimitExceeded);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(status, body));
            }

            let text = response.text().await?;
            Ok(serde_json::from_str(&text)?)
        })
        .await
    }
}

fn status_error(status: reqwest::StatusCode, body: String) -> ApiError {
    if is_retryable_status(status) {
        ApiError::ServerError {
            status: status.as_u16(),
            body,
        }
    } else {
        ApiError::RequestFailed(format!("Status {}: {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_parses_placeholder_payload() {
        let json = r#"[
            {"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit"},
            {"userId": 1, "id": 2, "title": "qui est esse", "body": "est rerum tempore"}
        ]"#;

        let posts: Vec<Post> = serde_json::from_str(json).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "sunt aut facere");
        assert_eq!(posts[1].id, Some(2));
    }

    #[test]
    fn test_post_tolerates_missing_fields() {
        let posts: Vec<Post> = serde_json::from_str(r#"[{"title": "only a title"}]"#).unwrap();
        assert_eq!(posts[0].title, "only a title");
        assert_eq!(posts[0].user_id, None);
        assert!(posts[0].body.is_empty());
    }

    #[test]
    fn test_new_post_wire_shape() {
        let post = NewPost {
            title: "Stay hungry".to_string(),
            body: "Motivation".to_string(),
            user_id: 1,
        };

        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"title": "Stay hungry", "body": "Motivation", "userId": 1})
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let client = PostsClient::with_base_url("http://localhost:3000/".to_string()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::RateLimitExceeded.is_retryable());
        assert!(ApiError::ServerError {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!ApiError::RequestFailed("Status 404".into()).is_retryable());
    }
}

// Remote source - bridges the posts API client with the sync engine
use async_trait::async_trait;
use quotesync_api::{NewPost, Post, PostsClient};
use tracing::{debug, info, warn};

use crate::models::Quote;
use crate::Error;

/// Category stamped on everything fetched from the server.
///
/// The server has no notion of categories. Existing snapshots already
/// contain this exact string, so it must never change.
pub const SERVER_SYNC_CATEGORY: &str = "ServerSync";

/// Where candidate quotes come from during a sync
///
/// Implementations swallow their own failures: an unreachable server
/// looks exactly like a server with nothing to offer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_candidates(&self) -> Vec<Quote>;

    /// Send one quote upstream. `false` if the server didn't take it.
    async fn push(&self, quote: &Quote) -> bool;
}

/// Posts turned into candidates per fetch unless configured otherwise
pub const DEFAULT_FETCH_LIMIT: usize = 10;

/// [`RemoteSource`] backed by the JSON posts endpoint
pub struct ServerSource {
    client: PostsClient,
    fetch_limit: usize,
    user_id: u64,
}

impl ServerSource {
    pub fn new(client: PostsClient) -> Self {
        Self {
            client,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            user_id: 1,
        }
    }

    /// Keep only the first `limit` posts. Zero means keep all of them.
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn with_user_id(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }
}

#[async_trait]
impl RemoteSource for ServerSource {
    async fn fetch_candidates(&self) -> Vec<Quote> {
        match self.client.list_posts().await {
            Ok(posts) => posts_to_quotes(posts, self.fetch_limit),
            Err(e) => {
                warn!("{}", Error::from(e));
                Vec::new()
            }
        }
    }

    async fn push(&self, quote: &Quote) -> bool {
        match self.client.create_post(&quote_to_post(quote, self.user_id)).await {
            Ok(echo) => {
                info!("Posted quote to server (id {:?})", echo.id);
                true
            }
            Err(e) => {
                warn!("Failed to post quote: {}", Error::from(e));
                false
            }
        }
    }
}

/// Titles become quote text; posts without a usable title are dropped
pub fn posts_to_quotes(posts: Vec<Post>, limit: usize) -> Vec<Quote> {
    let limit = if limit == 0 { usize::MAX } else { limit };

    posts
        .into_iter()
        .take(limit)
        .filter_map(|post| match Quote::new(post.title, SERVER_SYNC_CATEGORY) {
            Ok(quote) => Some(quote),
            Err(_) => {
                debug!("Skipping post {:?} with empty title", post.id);
                None
            }
        })
        .collect()
}

pub fn quote_to_post(quote: &Quote, user_id: u64) -> NewPost {
    NewPost {
        title: quote.text().to_string(),
        body: quote.category().to_string(),
        user_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64, title: &str) -> Post {
        Post {
            user_id: Some(1),
            id: Some(id),
            title: title.to_string(),
            body: "ignored".to_string(),
        }
    }

    #[test]
    fn test_posts_are_tagged_with_sentinel_category() {
        let quotes = posts_to_quotes(vec![post(1, "Foo"), post(2, "Bar")], 0);
        assert_eq!(
            quotes,
            vec![
                Quote::new("Foo", SERVER_SYNC_CATEGORY).unwrap(),
                Quote::new("Bar", SERVER_SYNC_CATEGORY).unwrap()
            ]
        );
    }

    #[test]
    fn test_fetch_limit_applies_in_order() {
        let posts = (1..=20).map(|i| post(i, &format!("post {}", i))).collect();
        let quotes = posts_to_quotes(posts, 5);
        assert_eq!(quotes.len(), 5);
        assert_eq!(quotes[0].text(), "post 1");
        assert_eq!(quotes[4].text(), "post 5");
    }

    #[test]
    fn test_blank_titles_are_dropped() {
        let quotes = posts_to_quotes(vec![post(1, "  "), post(2, "Real")], 0);
        assert_eq!(quotes, vec![Quote::new("Real", SERVER_SYNC_CATEGORY).unwrap()]);
    }

    #[test]
    fn test_quote_to_post_shape() {
        let quote = Quote::new("Be yourself", "Life").unwrap();
        let post = quote_to_post(&quote, 7);
        assert_eq!(
            serde_json::to_value(&post).unwrap(),
            serde_json::json!({"title": "Be yourself", "body": "Life", "userId": 7})
        );
    }

    #[test]
    fn test_default_fetch_limit_matches_config() {
        let client = PostsClient::with_base_url("http://localhost:3000".to_string()).unwrap();
        let source = ServerSource::new(client);
        assert_eq!(source.fetch_limit, DEFAULT_FETCH_LIMIT);
        assert_eq!(crate::Config::default().remote.fetch_limit, source.fetch_limit);
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_no_candidates() {
        // Grab a free port and release it so the connection is refused
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = PostsClient::with_base_url(format!("http://{}", addr))
            .unwrap()
            .with_retry_config(quotesync_api::RetryConfig {
                max_retries: 0,
                ..Default::default()
            });

        let source = ServerSource::new(client);
        assert!(source.fetch_candidates().await.is_empty());
        assert!(!source.push(&Quote::new("a", "b").unwrap()).await);
    }
}

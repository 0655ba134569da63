use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode, redirect};
use std::time::Duration;
use tracing::debug;

/// Approximate size of the Boostable Bosses page, used to pre-size body buffers.
pub const CONTENT_LENGTH_HINT: usize = 110_000;

/// Raw outcome of a GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Absolute redirect target from the `Location` header, if any
    pub location: Option<String>,
    /// Body text; empty unless the status is 200
    pub body: String,
}

/// Issues GET requests on behalf of the fetcher.
///
/// Implementations must not follow redirects: the fetcher needs to see a 302
/// to tell maintenance apart from other responses. Connection-level failures
/// are reported as [`Error::Transport`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request for `url`.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default 30 second timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a transport with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tibia-crawler/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect::Policy::none())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Transport)?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    ///
    /// The client should be built with `redirect::Policy::none()`; a client
    /// that follows redirects hides maintenance from the fetcher.
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|loc| resolve_location(url, loc));

        if status != StatusCode::OK {
            // Drain so the connection goes back to the pool.
            if let Err(e) = response.bytes().await {
                debug!("Failed to drain {} response from {}: {}", status, url, e);
            }
            return Ok(HttpResponse {
                status: status.as_u16(),
                location,
                body: String::new(),
            });
        }

        let mut buf = Vec::with_capacity(CONTENT_LENGTH_HINT);
        while let Some(chunk) = response.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        debug!("Read {} bytes from {}", buf.len(), url);

        Ok(HttpResponse {
            status: status.as_u16(),
            location,
            body: String::from_utf8_lossy(&buf).into_owned(),
        })
    }
}

/// Resolve a possibly relative `Location` header against the request URL.
fn resolve_location(request_url: &str, location: &str) -> String {
    url::Url::parse(request_url)
        .and_then(|base| base.join(location))
        .map_or_else(|_| location.to_string(), |resolved| resolved.to_string())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::disallowed_macros,
    clippy::match_wildcard_for_single_variants
)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("https://www.tibia.com/library/", "https://maintenance.tibia.com/"),
            "https://maintenance.tibia.com/"
        );
        assert_eq!(
            resolve_location("https://www.tibia.com/library/?a=b", "/news/"),
            "https://www.tibia.com/news/"
        );
        assert_eq!(resolve_location("not a url", "/x"), "/x");
    }

    #[tokio::test]
    async fn test_get_returns_body_on_200() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/"))
            .and(query_param("subtopic", "boostablebosses"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>bosses</html>"))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new()?;
        let url = format!("{}/library/?subtopic=boostablebosses", mock_server.uri());
        let response = transport.get(&url).await?;

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>bosses</html>");
        assert!(response.location.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_does_not_follow_redirects() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "https://maintenance.tibia.com/")
                    .set_body_string("moved"),
            )
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new()?;
        let response = transport
            .get(&format!("{}/library/", mock_server.uri()))
            .await?;

        assert_eq!(response.status, 302);
        assert_eq!(
            response.location.as_deref(),
            Some("https://maintenance.tibia.com/")
        );
        assert!(response.body.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_timeout_is_transport_error() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::with_timeout(Duration::from_millis(100))?;
        let result = transport.get(&mock_server.uri()).await;

        match result {
            Err(Error::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("Expected transport timeout, got: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_get_connection_refused_is_transport_error() -> anyhow::Result<()> {
        // Given: a port with nothing listening on it
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
            format!("http://{}/", listener.local_addr()?)
        };

        let transport = ReqwestTransport::with_timeout(Duration::from_secs(2))?;
        let result = transport.get(&uri).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        Ok(())
    }
}

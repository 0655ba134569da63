use crate::config::MAINTENANCE_HOST;
use crate::rate_limit::RateLimiter;
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::{CrawlerConfig, Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fetches tibia.com pages, classifying responses and retrying transient failures
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher over the given transport
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Creates a fetcher with a `reqwest` transport using the configured timeout
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout())?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Fetches `url` and returns the page body.
    ///
    /// Makes up to `retries` attempts (`0` and `1` both mean one). Transport
    /// failures, rate limiting and unknown statuses are retried; cancellation
    /// and maintenance are returned immediately. After the budget is spent the
    /// last error is returned.
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &str,
        rate_limiter: Option<&dyn RateLimiter>,
        retries: u8,
    ) -> Result<String> {
        let attempts = retries.max(1);
        let mut attempt = 1;

        loop {
            debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);
            match self.attempt(cancel, url, rate_limiter).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_recoverable() && attempt < attempts => {
                    warn!(
                        "Attempt {}/{} for {} failed ({}): {}",
                        attempt,
                        attempts,
                        url,
                        e.category(),
                        e
                    );
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        cancel: &CancellationToken,
        url: &str,
        rate_limiter: Option<&dyn RateLimiter>,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        if let Some(limiter) = rate_limiter {
            limiter.take().await;
            if cancel.is_cancelled() {
                return Err(Error::Canceled);
            }
        }

        let response = self.transport.get(url).await?;
        classify(response)
    }
}

/// Map a raw response onto the page body or a classified error.
fn classify(response: HttpResponse) -> Result<String> {
    match response.status {
        200 => Ok(response.body),
        403 => Err(Error::RateLimited {
            status: response.status,
        }),
        302 if response
            .location
            .as_deref()
            .is_some_and(is_maintenance_location) =>
        {
            Err(Error::Maintenance {
                location: response.location.unwrap_or_default(),
            })
        },
        status => Err(Error::UnknownStatus {
            status,
            location: response.location,
        }),
    }
}

fn is_maintenance_location(location: &str) -> bool {
    url::Url::parse(location)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.eq_ignore_ascii_case(MAINTENANCE_HOST)))
        .unwrap_or(false)
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
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// Replays scripted outcomes and counts calls.
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<HttpResponse>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(status(500)))
        }
    }

    #[derive(Default)]
    struct CountingLimiter {
        takes: AtomicUsize,
    }

    #[async_trait]
    impl RateLimiter for CountingLimiter {
        async fn take(&self) {
            self.takes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn status(code: u16) -> HttpResponse {
        HttpResponse {
            status: code,
            location: None,
            body: String::new(),
        }
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            location: None,
            body: body.to_string(),
        }
    }

    fn redirect(location: &str) -> HttpResponse {
        HttpResponse {
            status: 302,
            location: Some(location.to_string()),
            body: String::new(),
        }
    }

    /// A transport-level failure, produced by connecting to a closed port.
    async fn transport_error() -> Error {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        reqwest::get(format!("http://{addr}/")).await.unwrap_err().into()
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(ok("page")).unwrap(), "page");
        assert!(matches!(
            classify(status(403)),
            Err(Error::RateLimited { status: 403 })
        ));
        assert!(matches!(
            classify(redirect("https://maintenance.tibia.com/")),
            Err(Error::Maintenance { .. })
        ));
        assert!(matches!(
            classify(redirect("https://MAINTENANCE.tibia.com/index.html")),
            Err(Error::Maintenance { .. })
        ));
        assert!(matches!(
            classify(redirect("https://www.tibia.com/news/")),
            Err(Error::UnknownStatus { status: 302, location: Some(_) })
        ));
        assert!(matches!(
            classify(status(302)),
            Err(Error::UnknownStatus { status: 302, location: None })
        ));
        assert!(matches!(
            classify(status(500)),
            Err(Error::UnknownStatus { status: 500, .. })
        ));
        assert!(matches!(
            classify(status(404)),
            Err(Error::UnknownStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_retries_transport_errors_until_success() -> anyhow::Result<()> {
        // Given: two transport failures followed by a page
        let transport = ScriptedTransport::new(vec![
            Err(transport_error().await),
            Err(transport_error().await),
            Ok(ok("<html>page</html>")),
        ]);
        let fetcher = Fetcher::new(transport.clone());

        // When: fetching with a budget of three attempts
        let body = fetcher
            .fetch(&CancellationToken::new(), "https://www.tibia.com/", None, 3)
            .await?;

        // Then: the page is returned after exactly three calls
        assert_eq!(body, "<html>page</html>");
        assert_eq!(transport.calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_returns_last_error_when_budget_exhausted() {
        let transport = ScriptedTransport::new(vec![
            Ok(status(403)),
            Ok(status(403)),
            Ok(status(503)),
        ]);
        let fetcher = Fetcher::new(transport.clone());

        let result = fetcher
            .fetch(&CancellationToken::new(), "https://www.tibia.com/", None, 3)
            .await;

        assert!(matches!(
            result,
            Err(Error::UnknownStatus { status: 503, .. })
        ));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_and_one_retries_make_a_single_attempt() {
        for retries in [0, 1] {
            let transport = ScriptedTransport::new(vec![Ok(status(403)), Ok(ok("late"))]);
            let fetcher = Fetcher::new(transport.clone());

            let result = fetcher
                .fetch(&CancellationToken::new(), "https://www.tibia.com/", None, retries)
                .await;

            assert!(matches!(result, Err(Error::RateLimited { .. })));
            assert_eq!(transport.calls(), 1, "retries = {retries}");
        }
    }

    #[tokio::test]
    async fn test_maintenance_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Ok(redirect("https://maintenance.tibia.com/")),
            Ok(ok("never reached")),
        ]);
        let fetcher = Fetcher::new(transport.clone());

        let result = fetcher
            .fetch(&CancellationToken::new(), "https://www.tibia.com/", None, 5)
            .await;

        assert!(matches!(result, Err(Error::Maintenance { .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_canceled_token_makes_no_request() {
        let transport = ScriptedTransport::new(vec![Ok(ok("page"))]);
        let limiter = CountingLimiter::default();
        let fetcher = Fetcher::new(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetcher
            .fetch(&cancel, "https://www.tibia.com/", Some(&limiter), 3)
            .await;

        assert!(matches!(result, Err(Error::Canceled)));
        assert_eq!(transport.calls(), 0);
        assert_eq!(limiter.takes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_is_taken_before_every_attempt() -> anyhow::Result<()> {
        let transport = ScriptedTransport::new(vec![Ok(status(403)), Ok(ok("page"))]);
        let limiter = CountingLimiter::default();
        let fetcher = Fetcher::new(transport.clone());

        fetcher
            .fetch(
                &CancellationToken::new(),
                "https://www.tibia.com/",
                Some(&limiter),
                2,
            )
            .await?;

        assert_eq!(limiter.takes.load(Ordering::SeqCst), 2);
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_against_mock_server() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/library/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bosses"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new(Arc::new(ReqwestTransport::new()?));
        let url = format!("{}/library/?subtopic=boostablebosses", mock_server.uri());
        let body = fetcher.fetch(&CancellationToken::new(), &url, None, 2).await?;

        assert_eq!(body, "bosses");
        Ok(())
    }

    #[tokio::test]
    async fn test_maintenance_redirect_against_mock_server() -> anyhow::Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "https://maintenance.tibia.com/"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::new(Arc::new(ReqwestTransport::new()?));
        let result = fetcher
            .fetch(&CancellationToken::new(), &mock_server.uri(), None, 4)
            .await;

        match result {
            Err(Error::Maintenance { location }) => {
                assert!(location.contains("maintenance.tibia.com"));
            },
            other => panic!("Expected maintenance, got: {other:?}"),
        }
        Ok(())
    }
}

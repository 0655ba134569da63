//! Parser for the tibia.com Boostable Bosses library page.
//!
//! The page changes once a day, during server save. Lookups are answered from
//! an in-memory snapshot, except while the server save window is open or when
//! the caller disallows cached responses; those lookups fetch and extract the
//! page again and publish the result.
//!
//! | server save window open | `disallow_cached_responses` | action |
//! |---|---|---|
//! | yes | any | fetch, extract, store, return |
//! | no | `false` | return the cached snapshot |
//! | no | `true` | fetch, extract, store, return |
//!
//! Before the first successful refresh the cached snapshot is empty. Callers
//! that need data right away pass
//! [`ParseOptions::disallow_cached_responses`] on their first lookup.
//!
//! Concurrent refreshes are not coalesced: each one fetches, and the last to
//! finish wins. The page content is the same for the whole day, so the order
//! does not matter here.

use crate::cache::SnapshotCache;
use crate::fetcher::Fetcher;
use crate::parser::{ParseOptions, Parser};
use crate::types::BoostableBosses;
use crate::window::{Clock, ServerSaveWindow, SystemClock};
use crate::{CrawlerConfig, Result, extract_boostable_bosses};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Path of the Boostable Bosses library page.
pub const ENDPOINT: &str = "/library/?subtopic=boostablebosses";

/// Arguments for [`BoostableBossesParser`]. The page takes none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoostableBossesArgs;

/// Fetches, caches and extracts the Boostable Bosses library page.
pub struct BoostableBossesParser {
    url: String,
    fetcher: Fetcher,
    window: ServerSaveWindow,
    clock: Arc<dyn Clock>,
    cache: SnapshotCache,
}

impl std::fmt::Debug for BoostableBossesParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostableBossesParser")
            .field("url", &self.url)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl BoostableBossesParser {
    /// Create a parser from the resolved configuration.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            url: config.endpoint_url(ENDPOINT),
            fetcher: Fetcher::from_config(config)?,
            window: config.server_save_window()?,
            clock: Arc::new(SystemClock),
            cache: SnapshotCache::new(),
        })
    }

    /// Replace the fetcher, e.g. to use a custom transport for every call.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replace the clock used to evaluate the server save window.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot without any network access.
    pub async fn cached(&self) -> Arc<BoostableBosses> {
        self.cache.load().await
    }

    /// Fetch and extract the page, then publish the result.
    ///
    /// On failure the cache keeps its previous snapshot.
    async fn refresh(
        &self,
        cancel: &CancellationToken,
        opts: &ParseOptions,
    ) -> Result<Arc<BoostableBosses>> {
        let override_fetcher = opts.transport.clone().map(Fetcher::new);
        let fetcher = override_fetcher.as_ref().unwrap_or(&self.fetcher);

        let page = fetcher
            .fetch(cancel, &self.url, opts.rate_limiter.as_deref(), opts.retries)
            .await?;
        let parsed = extract_boostable_bosses(&page)?;

        info!(
            "Refreshed boostable bosses: {} bosses, boosted: {}",
            parsed.bosses.len(),
            parsed.boosted.name
        );
        Ok(self.cache.store(parsed).await)
    }
}

#[async_trait]
impl Parser<BoostableBossesArgs, Arc<BoostableBosses>> for BoostableBossesParser {
    async fn parse(
        &self,
        cancel: &CancellationToken,
        _args: BoostableBossesArgs,
        opts: ParseOptions,
    ) -> Result<Arc<BoostableBosses>> {
        if self.window.is_refresh_due(self.clock.now()) {
            debug!("Server save window open, refreshing boostable bosses");
            return self.refresh(cancel, &opts).await;
        }

        if opts.disallow_cached_responses {
            debug!("Cached responses disallowed, refreshing boostable bosses");
            return self.refresh(cancel, &opts).await;
        }

        debug!("Serving cached boostable bosses");
        Ok(self.cache.load().await)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transport::{HttpResponse, HttpTransport};
    use crate::window::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE_TEMPLATE: &str = concat!(
        "<html>\n",
        r#"<div class="main-content Content">"#,
        "\n",
        r#"<img title="Today's boosted boss: {boosted}" src="https://static.tibia.com/images/global/header/monsters/{boosted}.gif" onClick="" />"#,
        "\n",
        r#"<div class="CaptionContainer">"#,
        r#"<img src="https://static.tibia.com/images/library/gnomevil.gif" border=0 /> <div>Gnomevil</div>"#,
        r#"<img src="https://static.tibia.com/images/library/sharpclaw.gif" border=0 /> <div>Sharpclaw</div>"#,
        "</div>\n",
        r#"<div id="Footer" class="main-footer">"#,
        "\n</html>"
    );

    fn page(boosted: &str) -> String {
        PAGE_TEMPLATE.replace("{boosted}", boosted)
    }

    /// Serves a configurable page and counts requests.
    struct StubTransport {
        response: Mutex<HttpResponse>,
        calls: AtomicUsize,
    }

    impl StubTransport {
        fn serving(body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(HttpResponse {
                    status: 200,
                    location: None,
                    body: body.to_string(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, status: u16, location: Option<&str>, body: &str) {
            *self.response.lock().unwrap() = HttpResponse {
                status,
                location: location.map(str::to_string),
                body: body.to_string(),
            };
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.lock().unwrap().clone())
        }
    }

    /// Replays scripted outcomes in order and counts calls.
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
            self.outcomes.lock().unwrap().pop_front().unwrap()
        }
    }

    /// A connection failure against a port nothing listens on.
    async fn transport_error() -> Error {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        reqwest::get(format!("http://{addr}/")).await.unwrap_err().into()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
    }

    fn server_save() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 8, 15, 0).unwrap()
    }

    fn parser(transport: Arc<StubTransport>, now: DateTime<Utc>) -> BoostableBossesParser {
        BoostableBossesParser::new(&CrawlerConfig::default())
            .unwrap()
            .with_fetcher(Fetcher::new(transport))
            .with_clock(Arc::new(FixedClock(now)))
    }

    async fn parse(
        parser: &BoostableBossesParser,
        opts: ParseOptions,
    ) -> Result<Arc<BoostableBosses>> {
        parser
            .parse(&CancellationToken::new(), BoostableBossesArgs, opts)
            .await
    }

    #[test]
    fn test_url_uses_configured_base() {
        let config = CrawlerConfig {
            base_url: "http://proxy.local:8080/".to_string(),
            ..CrawlerConfig::default()
        };
        let parser = BoostableBossesParser::new(&config).unwrap();
        assert_eq!(
            parser.url(),
            "http://proxy.local:8080/library/?subtopic=boostablebosses"
        );
    }

    #[tokio::test]
    async fn test_cached_snapshot_served_outside_window() -> Result<()> {
        // Given: a populated cache and a clock outside the window
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), noon());
        parse(&parser, ParseOptions::default().disallow_cached_responses()).await?;
        assert_eq!(transport.calls(), 1);

        // When: the page changes and cached responses are allowed
        transport.set(200, None, &page("Gnomevil"));
        let result = parse(&parser, ParseOptions::default()).await?;

        // Then: the cached value is returned without a request
        assert_eq!(result.boosted.name, "Sharpclaw");
        assert_eq!(transport.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_disallowed_cache_always_fetches() -> Result<()> {
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), noon());
        parse(&parser, ParseOptions::default().disallow_cached_responses()).await?;

        transport.set(200, None, &page("Gnomevil"));
        let result = parse(&parser, ParseOptions::default().disallow_cached_responses()).await?;

        assert_eq!(result.boosted.name, "Gnomevil");
        assert_eq!(transport.calls(), 2);
        assert_eq!(parser.cached().await.boosted.name, "Gnomevil");
        Ok(())
    }

    #[tokio::test]
    async fn test_window_forces_refresh_even_when_cache_allowed() -> Result<()> {
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), server_save());

        parse(&parser, ParseOptions::default()).await?;
        transport.set(200, None, &page("Gnomevil"));
        let result = parse(&parser, ParseOptions::default()).await?;

        assert_eq!(result.boosted.name, "Gnomevil");
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_cold_cache_outside_window_makes_no_request() -> Result<()> {
        // Given: a fresh parser and a clock outside the window
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), noon());

        // When: parsing with cached responses allowed
        let result = parse(&parser, ParseOptions::default()).await?;

        // Then: the empty snapshot is returned without touching the origin
        assert!(result.is_empty());
        assert_eq!(*result, BoostableBosses::default());
        assert_eq!(transport.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_through_parse() -> Result<()> {
        // Given: a transport failing twice before serving the page
        let transport = ScriptedTransport::new(vec![
            Err(transport_error().await),
            Err(transport_error().await),
            Ok(HttpResponse {
                status: 200,
                location: None,
                body: page("Sharpclaw"),
            }),
        ]);
        let own = StubTransport::serving(&page("Gnomevil"));
        let parser = parser(own.clone(), server_save());

        // When: parsing with three attempts through the per-call transport
        let result = parse(
            &parser,
            ParseOptions::default()
                .with_transport(transport.clone())
                .with_retries(3),
        )
        .await?;

        // Then: the third attempt's page is returned and published
        assert_eq!(result.boosted.name, "Sharpclaw");
        assert_eq!(transport.calls(), 3);
        assert_eq!(own.calls(), 0);
        assert_eq!(parser.cached().await, result);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot() -> Result<()> {
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), noon());
        parse(&parser, ParseOptions::default().disallow_cached_responses()).await?;

        // A page missing its main content
        transport.set(200, None, "<html>maintenance notice</html>");
        let result = parse(&parser, ParseOptions::default().disallow_cached_responses()).await;
        assert!(matches!(result, Err(Error::Structure(_))));

        // A rate-limited origin
        transport.set(403, None, "");
        let result = parse(
            &parser,
            ParseOptions::default()
                .disallow_cached_responses()
                .with_retries(2),
        )
        .await;
        assert!(matches!(result, Err(Error::RateLimited { .. })));

        assert_eq!(parser.cached().await.boosted.name, "Sharpclaw");
        Ok(())
    }

    #[tokio::test]
    async fn test_maintenance_surfaces_after_one_attempt() {
        let transport = StubTransport::serving("");
        transport.set(302, Some("https://maintenance.tibia.com/"), "");
        let parser = parser(transport.clone(), server_save());

        let result = parse(&parser, ParseOptions::default().with_retries(5)).await;

        assert!(matches!(result, Err(Error::Maintenance { .. })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_override_is_used_for_the_call() -> Result<()> {
        let own = StubTransport::serving(&page("Sharpclaw"));
        let other = StubTransport::serving(&page("Gnomevil"));
        let parser = parser(own.clone(), noon());

        let result = parse(
            &parser,
            ParseOptions::default()
                .disallow_cached_responses()
                .with_transport(other.clone()),
        )
        .await?;

        assert_eq!(result.boosted.name, "Gnomevil");
        assert_eq!(own.calls(), 0);
        assert_eq!(other.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_canceled_refresh_makes_no_request() {
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport.clone(), server_save());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = parser
            .parse(&cancel, BoostableBossesArgs, ParseOptions::default())
            .await;

        assert!(matches!(result, Err(Error::Canceled)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_featured_flag_follows_boosted_name() -> Result<()> {
        let transport = StubTransport::serving(&page("Sharpclaw"));
        let parser = parser(transport, noon());

        let result = parse(&parser, ParseOptions::default().disallow_cached_responses()).await?;

        let flags: Vec<_> = result.bosses.iter().map(|b| (b.name.as_str(), b.is_boosted)).collect();
        assert_eq!(flags, [("Gnomevil", false), ("Sharpclaw", true)]);
        Ok(())
    }
}

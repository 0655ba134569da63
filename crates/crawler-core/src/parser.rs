//! The contract shared by tibia.com page parsers.

use crate::Result;
use crate::rate_limit::RateLimiter;
use crate::transport::HttpTransport;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Parses one tibia.com page into structured data.
///
/// `A` carries whatever the page needs to be located (a character name, a
/// world); `P` is the parsed result.
///
/// Implementations may cache parsed results and answer from the cache, but
/// must go to the origin when [`ParseOptions::disallow_cached_responses`] is
/// set.
#[async_trait]
pub trait Parser<A, P>: Send + Sync
where
    A: Send + 'static,
{
    /// Fetch the page (or use the cache) and return the parsed data.
    ///
    /// `cancel` is checked before every request attempt.
    async fn parse(&self, cancel: &CancellationToken, args: A, opts: ParseOptions) -> Result<P>;

    /// The tibia.com endpoint this parser reads.
    fn url(&self) -> &str;
}

/// Per-call options for [`Parser::parse`].
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// Transport to use instead of the parser's own.
    pub transport: Option<Arc<dyn HttpTransport>>,

    /// Limiter awaited before every request. Without one, requests are not paced.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,

    /// Attempt budget. `0` and `1` both mean a single attempt.
    pub retries: u8,

    /// Never answer from the cache.
    pub disallow_cached_responses: bool,
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("transport", &self.transport.is_some())
            .field("rate_limiter", &self.rate_limiter.is_some())
            .field("retries", &self.retries)
            .field("disallow_cached_responses", &self.disallow_cached_responses)
            .finish()
    }
}

impl ParseOptions {
    /// Use `transport` for this call.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Pace requests with `rate_limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Allow up to `retries` attempts.
    #[must_use]
    pub const fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Always fetch from the origin.
    #[must_use]
    pub const fn disallow_cached_responses(mut self) -> Self {
        self.disallow_cached_responses = true;
        self
    }
}

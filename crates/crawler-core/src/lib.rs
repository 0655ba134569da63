//! # crawler-core
//!
//! Core functionality for tibia-crawler: fetching the tibia.com Boostable Bosses
//! library page, extracting today's boosted boss and the full boss list, and
//! serving the result from an in-memory cache.
//!
//! ## Architecture
//!
//! The crate is organized around a small fetch/cache/extract pipeline:
//!
//! - **Transport**: [`HttpTransport`] issues the GET request; [`ReqwestTransport`] is the default
//! - **Fetching**: [`Fetcher`] honors cancellation and rate limiting, classifies responses and retries
//! - **Refresh window**: [`ServerSaveWindow`] decides when cached data is guaranteed stale
//! - **Extraction**: [`extract_boostable_bosses`] scans the page with ordered marker searches
//! - **Caching**: [`SnapshotCache`] publishes immutable snapshots to concurrent readers
//! - **Facade**: [`BoostableBossesParser`] ties it together behind the [`Parser`] contract
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crawler_core::{
//!     BoostableBossesArgs, BoostableBossesParser, CrawlerConfig, ParseOptions, Parser,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> crawler_core::Result<()> {
//! let config = CrawlerConfig::load()?;
//! let parser = BoostableBossesParser::new(&config)?;
//!
//! let cancel = CancellationToken::new();
//!
//! // Warm the cache; later lookups outside server save are served from memory.
//! parser
//!     .parse(&cancel, BoostableBossesArgs, ParseOptions::default().disallow_cached_responses())
//!     .await?;
//! let bosses = parser
//!     .parse(&cancel, BoostableBossesArgs, ParseOptions::default())
//!     .await?;
//!
//! println!("Boosted today: {}", bosses.boosted.name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Transport and status failures are
//! retried up to the configured budget; maintenance and markup failures are not:
//!
//! ```rust
//! use crawler_core::Error;
//!
//! let err = Error::Maintenance { location: "https://maintenance.tibia.com/".into() };
//! assert!(!err.is_recoverable());
//! assert_eq!(err.category(), "maintenance");
//! ```

/// Boostable bosses facade with cache and refresh window
pub mod boostable_bosses;
/// In-memory snapshot cache
pub mod cache;
/// Process configuration resolved once at startup
pub mod config;
/// Error types and result aliases
pub mod error;
/// Marker-based extraction of the boostable bosses page
pub mod extract;
/// HTTP fetching with classification and retries
pub mod fetcher;
/// The parser contract shared by page parsers
pub mod parser;
/// Request pacing
pub mod rate_limit;
/// Cursor-based substring scanner
pub mod scanner;
/// HTTP transport abstraction
pub mod transport;
/// Core data types
pub mod types;
/// Server save refresh window and clocks
pub mod window;

// Re-export commonly used types
pub use boostable_bosses::{BoostableBossesArgs, BoostableBossesParser, ENDPOINT};
pub use cache::SnapshotCache;
pub use config::{CrawlerConfig, DEFAULT_BASE_URL, MAINTENANCE_HOST};
pub use error::{Error, Result};
pub use extract::extract_boostable_bosses;
pub use fetcher::Fetcher;
pub use parser::{ParseOptions, Parser};
pub use rate_limit::{PacedRateLimiter, RateLimiter, default_rate_limiter};
pub use scanner::Scanner;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{AMOUNT_OF_BOOSTABLE_BOSSES, BoostableBoss, BoostableBosses};
pub use window::{Clock, FixedClock, ServerSaveWindow, SystemClock};

//! Error types and handling for crawler-core operations.
//!
//! This module provides a single error type covering every failure of the
//! fetch/cache/extract pipeline. Errors are categorized for logging and carry
//! a recoverability flag that drives the fetcher's retry loop.
//!
//! ## Error Categories
//!
//! - **Canceled**: the caller aborted before a network attempt
//! - **Transport**: DNS, connection and timeout failures
//! - **Rate limited**: tibia.com answered 403
//! - **Maintenance**: tibia.com redirected to its maintenance host
//! - **Unknown status**: any other response the crawler does not understand
//! - **Structure**: an expected marker was missing from the page
//! - **Configuration / I/O**: the config file is unreadable or invalid
//!
//! ## Recovery Hints
//!
//! ```rust
//! use crawler_core::Error;
//!
//! let transient = Error::RateLimited { status: 403 };
//! let permanent = Error::Structure("main content not found".into());
//!
//! assert!(transient.is_recoverable());
//! assert!(!permanent.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for crawler-core operations.
///
/// A failed parse never touches the cache, so callers that hold on to an
/// earlier snapshot can keep serving it after receiving any of these.
#[derive(Error, Debug)]
pub enum Error {
    /// The cancellation token was already triggered before a request was made.
    #[error("Canceled: request aborted before reaching tibia.com")]
    Canceled,

    /// The request could not be completed.
    ///
    /// Covers DNS resolution, connection failures, timeouts and body read
    /// errors. The underlying `reqwest::Error` is preserved.
    ///
    /// ## Recoverability
    ///
    /// Always retried by the fetcher.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// tibia.com refused the request with 403, its signal for too many requests.
    ///
    /// ## Recoverability
    ///
    /// Retried by the fetcher. Pass a rate limiter to avoid it altogether.
    #[error("Rate limited: request forbidden by tibia.com (status {status})")]
    RateLimited {
        /// Status code returned by the origin.
        status: u16,
    },

    /// tibia.com redirected to its maintenance host.
    ///
    /// ## Recoverability
    ///
    /// Never retried: the site stays offline for the duration of the maintenance.
    #[error("Maintenance: tibia.com is under maintenance (redirected to {location})")]
    Maintenance {
        /// Redirect target that identified the maintenance.
        location: String,
    },

    /// tibia.com answered with a status the crawler does not handle.
    ///
    /// Includes redirects to hosts other than the maintenance host.
    #[error("Unknown status code {status}{}", location.as_deref().map(|l| format!(" (location: {l})")).unwrap_or_default())]
    UnknownStatus {
        /// Status code returned by the origin.
        status: u16,
        /// Redirect target, when the response carried one.
        location: Option<String>,
    },

    /// The page did not contain an expected marker.
    ///
    /// Signals that tibia.com changed its page format. Retrying cannot help.
    #[error("Structure error: {0}")]
    Structure(String),

    /// Configuration is invalid or inaccessible.
    ///
    /// ## Common Causes
    ///
    /// - Invalid TOML syntax in the config file
    /// - Malformed `HH:MM` refresh window boundaries
    /// - A base URL that cannot be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config: {err}"))
    }
}

impl Error {
    /// Check if the error might go away when the request is repeated.
    ///
    /// The fetcher retries recoverable errors until its attempt budget is
    /// exhausted and surfaces everything else immediately.
    ///
    /// # Returns
    ///
    /// - `true` for transport failures, rate limiting and unknown statuses
    /// - `false` for cancellation, maintenance, markup and configuration errors
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited { .. } | Self::UnknownStatus { .. }
        )
    }

    /// Get the error category as a string identifier.
    ///
    /// - `"canceled"`, `"network"`, `"rate_limited"`, `"maintenance"`,
    ///   `"unknown_status"`, `"structure"`, `"config"`, `"io"`
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::Transport(_) => "network",
            Self::RateLimited { .. } => "rate_limited",
            Self::Maintenance { .. } => "maintenance",
            Self::UnknownStatus { .. } => "unknown_status",
            Self::Structure(_) => "structure",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

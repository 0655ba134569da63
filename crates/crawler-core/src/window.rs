//! Server save window.
//!
//! tibia.com rotates the boosted boss during the daily server save. Any
//! snapshot fetched before the save is stale once it ends, so lookups made
//! inside the window always go to the origin.

use crate::{Error, Result};
use chrono::{DateTime, NaiveTime, Utc};

const TIME_LAYOUT: &str = "%H:%M";

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at a fixed instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Daily UTC interval during which cached data must be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSaveWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl Default for ServerSaveWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 58, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl ServerSaveWindow {
    /// Build a window from explicit boundaries.
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` boundaries.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |value: &str| {
            NaiveTime::parse_from_str(value.trim(), TIME_LAYOUT).map_err(|e| {
                Error::Config(format!("Invalid server save time '{value}': {e}"))
            })
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }

    /// Start boundary.
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// End boundary.
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether `now` falls strictly between the boundaries.
    ///
    /// Only the time of day is compared. A window whose end is not after its
    /// start never matches.
    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        let time = now.time();
        time > self.start && time < self.end
    }
}

//! Time, randomness and text extraction used by the workflows.
//!
//! Production code uses [`Providers::default`]; tests swap in fixed values.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::service::text::{HtmlText, TextExtractor};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of random bytes for local identifiers.
pub trait RandomSource: Send + Sync {
    /// Sixteen random bytes.
    fn random_bytes(&self) -> [u8; 16];
}

/// Random bytes from version 4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRandom;

impl RandomSource for UuidRandom {
    fn random_bytes(&self) -> [u8; 16] {
        Uuid::new_v4().into_bytes()
    }
}

/// Always returns the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub [u8; 16]);

impl RandomSource for FixedRandom {
    fn random_bytes(&self) -> [u8; 16] {
        self.0
    }
}

/// The injectable dependencies of the create workflow.
#[derive(Clone)]
pub struct Providers {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    text: Arc<dyn TextExtractor>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            random: Arc::new(UuidRandom),
            text: Arc::new(HtmlText),
        }
    }
}

impl Providers {
    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the random source.
    #[must_use]
    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }

    /// Replaces the text extractor.
    #[must_use]
    pub fn with_text_extractor(mut self, text: impl TextExtractor + 'static) -> Self {
        self.text = Arc::new(text);
        self
    }

    /// Current time truncated to whole seconds.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(0)
    }

    /// Thirty-two lowercase hex characters.
    #[must_use]
    pub fn random_hex(&self) -> String {
        Uuid::from_bytes(self.random.random_bytes())
            .simple()
            .to_string()
    }

    /// The text extractor.
    #[must_use]
    pub fn text(&self) -> &dyn TextExtractor {
        self.text.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_now_is_whole_seconds() {
        let time = Utc
            .with_ymd_and_hms(2022, 3, 16, 16, 55, 45)
            .unwrap()
            .with_nanosecond(987_654_321)
            .unwrap();
        let providers = Providers::default().with_clock(FixedClock(time));

        let now = providers.now();
        assert_eq!(now.nanosecond(), 0);
        assert_eq!(now.second(), 45);
    }

    #[test]
    fn test_random_hex() {
        let providers = Providers::default().with_random(FixedRandom([0xab; 16]));
        assert_eq!(providers.random_hex(), "ab".repeat(16));

        let random = Providers::default().random_hex();
        assert_eq!(random.len(), 32);
        assert!(random.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}

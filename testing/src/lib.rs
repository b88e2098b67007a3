//! # Triage Testing
//!
//! Testing utilities for the triage bot.
//!
//! This crate provides:
//! - A fixed clock for deterministic thread names
//! - A Given-When-Then harness for reducers
//! - [`InMemoryGuild`], an implementation of every platform port with a call
//!   log, failure injection and optional latency
//! - proptest strategies for identifiers
//!
//! ## Example
//!
//! ```ignore
//! use triage_testing::{InMemoryGuild, test_clock};
//!
//! #[tokio::test]
//! async fn approve_creates_one_thread() {
//!     let guild = InMemoryGuild::new(GUILD, BOT);
//!     guild.post_message(REQUESTS, MessageId::new(10), vec![CUSTOMER]);
//!
//!     let app = app_with(guild.clone());
//!     app.on_reaction_added(approve_by(DEVELOPER)).await??;
//!
//!     assert_eq!(guild.threads().len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use triage_core::environment::Clock;

pub mod platform_mocks;
pub mod reducer_test;

/// Deterministic stand-ins for the environment.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Clock frozen at one instant, so thread names are predictable.
    ///
    /// # Example
    ///
    /// ```
    /// use triage_testing::mocks::FixedClock;
    /// use triage_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Clock that always reports `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock frozen at 2025-01-01 00:00:00 UTC.
    ///
    /// Thread names created under it end in `2025-01-01 00:00:00.000000`.
    ///
    /// # Panics
    ///
    /// Never; the timestamp is a literal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("literal timestamp parses")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::hash_set;
    use proptest::prelude::*;
    use triage_core::ids::UserId;

    /// Snowflake-shaped ids; small values are reserved for fixtures.
    pub fn snowflake() -> impl Strategy<Value = u64> {
        1_000u64..u64::from(u32::MAX)
    }

    /// Between `min` and `max` distinct users.
    pub fn distinct_users(min: usize, max: usize) -> impl Strategy<Value = Vec<UserId>> {
        hash_set(snowflake(), min..=max)
            .prop_map(|raw| raw.into_iter().map(UserId::new).collect())
    }
}

pub use mocks::{FixedClock, test_clock};
pub use platform_mocks::{InMemoryGuild, PlatformCall};
pub use reducer_test::{ReducerTest, assertions};

//! Environment for the request workflow reducer.

use crate::config::DeskConfig;
use crate::threads::ThreadLifecycle;
use std::sync::Arc;
use triage_core::environment::Clock;
use triage_core::ids::UserId;
use triage_core::platform::{MemberDirectory, RequestChannel};

/// Dependencies of the request workflow.
///
/// Production wires the live platform and `SystemClock`; tests use
/// `InMemoryGuild` and `FixedClock`.
#[derive(Clone)]
pub struct RequestEnvironment {
    /// Channel and role identifiers
    pub config: Arc<DeskConfig>,
    /// The bot's own user id
    pub identity: UserId,
    /// Time source for thread names
    pub clock: Arc<dyn Clock>,
    /// Request messages and reactions
    pub messages: Arc<dyn RequestChannel>,
    /// Request threads
    pub threads: ThreadLifecycle,
    /// Role membership
    pub members: Arc<dyn MemberDirectory>,
}

impl RequestEnvironment {
    /// Create a new environment.
    #[must_use]
    pub fn new(
        config: Arc<DeskConfig>,
        identity: UserId,
        clock: Arc<dyn Clock>,
        messages: Arc<dyn RequestChannel>,
        threads: ThreadLifecycle,
        members: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            config,
            identity,
            clock,
            messages,
            threads,
            members,
        }
    }
}

//! Actions for the request ticket workflow.

use crate::error::PlatformCallFailure;
use crate::requests::types::{Outcome, RequestSnapshot};
use triage_core::event::{MessageCreated, ReactionAdded};

/// Actions processed by the `RequestReducer`.
///
/// The first two are inbound platform events; the rest are fed back by
/// effects as platform calls complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAction {
    /// A message was posted; attach the reaction alphabet if it is a request.
    RequestPosted(MessageCreated),

    /// A reaction was added to some message.
    ReactionAdded(ReactionAdded),

    /// The live request state was read for a reaction.
    SnapshotLoaded {
        /// The reaction being processed
        reaction: ReactionAdded,
        /// `None` when the request message no longer exists
        snapshot: Option<RequestSnapshot>,
    },

    /// All platform calls of a transition succeeded.
    TransitionApplied(Outcome),

    /// A platform call failed and the transition was aborted.
    TransitionFailed(PlatformCallFailure),
}

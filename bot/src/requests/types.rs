//! Core types for the request ticket workflow.

use crate::error::{PlatformCallFailure, Rejection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use triage_core::ids::{ChannelId, MessageId, UserId};
use triage_core::platform::{FetchedMessage, FetchedReaction, ThreadInfo};

/// Marker the bot adds to a locked request.
pub const LOCK_MARKER: &str = "🔒";

/// Distinct reporters needed to delete a request.
pub const REPORT_THRESHOLD: usize = 5;

/// The recognized reaction alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionSymbol {
    /// ✅ a developer claims the request
    Approve,
    /// 🔐 the customer closes the request
    ClaimLock,
    /// ❌ a developer flags the request
    Report,
}

impl ReactionSymbol {
    /// Every symbol, in the order they are attached to new requests.
    pub const ALPHABET: [Self; 3] = [Self::Approve, Self::ClaimLock, Self::Report];

    /// Emoji form.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Approve => "✅",
            Self::ClaimLock => "🔐",
            Self::Report => "❌",
        }
    }

    /// Recognize an emoji. Anything outside the alphabet, including the lock
    /// marker, yields `None`.
    #[must_use]
    pub fn parse(emoji: &str) -> Option<Self> {
        Self::ALPHABET
            .into_iter()
            .find(|symbol| symbol.emoji() == emoji)
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::ClaimLock => "claim_lock",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for ReactionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.emoji())
    }
}

/// Reactors per recognized symbol, plus whether the lock marker is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSet {
    approve: Vec<UserId>,
    claim_lock: Vec<UserId>,
    report: Vec<UserId>,
    locked: bool,
}

impl ReactionSet {
    /// Build from the reactions of a fetched message.
    #[must_use]
    pub fn from_reactions(reactions: &[FetchedReaction]) -> Self {
        let mut set = Self::default();
        for reaction in reactions {
            if reaction.emoji == LOCK_MARKER {
                set.locked = true;
                continue;
            }
            if let Some(symbol) = ReactionSymbol::parse(&reaction.emoji) {
                set.slot_mut(symbol).extend(reaction.users.iter().copied());
            }
        }
        set
    }

    /// Mark the set as carrying the lock marker.
    #[must_use]
    pub const fn with_lock(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Add a reactor.
    #[must_use]
    pub fn with(mut self, symbol: ReactionSymbol, user: UserId) -> Self {
        self.slot_mut(symbol).push(user);
        self
    }

    fn slot_mut(&mut self, symbol: ReactionSymbol) -> &mut Vec<UserId> {
        match symbol {
            ReactionSymbol::Approve => &mut self.approve,
            ReactionSymbol::ClaimLock => &mut self.claim_lock,
            ReactionSymbol::Report => &mut self.report,
        }
    }

    /// Users currently reacting with `symbol`.
    #[must_use]
    pub fn reactors(&self, symbol: ReactionSymbol) -> &[UserId] {
        match symbol {
            ReactionSymbol::Approve => &self.approve,
            ReactionSymbol::ClaimLock => &self.claim_lock,
            ReactionSymbol::Report => &self.report,
        }
    }

    /// `true` when the lock marker is present.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Distinct report reactors accepted by `counts`.
    #[must_use]
    pub fn distinct_reporters<F>(&self, counts: F) -> usize
    where
        F: Fn(UserId) -> bool,
    {
        self.report
            .iter()
            .copied()
            .filter(|user| counts(*user))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Derived ticket state. Never stored; recomputed on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    /// No lock marker, no thread
    Open,
    /// A thread exists, no lock marker
    Claimed,
    /// The lock marker is present
    Locked,
    /// The request message is gone
    Deleted,
}

impl TicketStatus {
    /// Derive the status of an existing request message.
    #[must_use]
    pub const fn derive(reactions: &ReactionSet, thread_exists: bool) -> Self {
        if reactions.is_locked() {
            Self::Locked
        } else if thread_exists {
            Self::Claimed
        } else {
            Self::Open
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Locked => "locked",
            Self::Deleted => "deleted",
        }
    }
}

/// Live view of one request, read at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Request message
    pub message_id: MessageId,
    /// Channel holding the request
    pub channel_id: ChannelId,
    /// First mentioned user
    pub customer: Option<UserId>,
    /// Recognized reactions
    pub reactions: ReactionSet,
    /// Active threads whose name references the request
    pub threads: Vec<ThreadInfo>,
}

impl RequestSnapshot {
    /// Combine a fetched message with the threads that reference it.
    #[must_use]
    pub fn new(message: &FetchedMessage, threads: Vec<ThreadInfo>) -> Self {
        Self {
            message_id: message.id,
            channel_id: message.channel_id,
            customer: message.mentions.first().copied(),
            reactions: ReactionSet::from_reactions(&message.reactions),
            threads,
        }
    }

    /// Derived status.
    #[must_use]
    pub fn status(&self) -> TicketStatus {
        TicketStatus::derive(&self.reactions, !self.threads.is_empty())
    }
}

/// Why an event was dropped before any decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The bot's own reaction or message
    OwnEvent,
    /// Not in the requests channel
    OutsideRequestChannel,
    /// Emoji outside the alphabet
    UnrecognizedEmoji,
    /// The request message no longer exists
    MessageGone,
}

impl IgnoreReason {
    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OwnEvent => "own_event",
            Self::OutsideRequestChannel => "outside_request_channel",
            Self::UnrecognizedEmoji => "unrecognized_emoji",
            Self::MessageGone => "message_gone",
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to decide
    Ignored(IgnoreReason),
    /// Declined; the triggering reaction may have been stripped
    Rejected(Rejection),
    /// The reaction alphabet was attached to a new request
    ReactionsAttached,
    /// A thread was created and staffed
    Claimed {
        /// The new thread
        thread: ThreadInfo,
        /// Participants added
        participants: usize,
    },
    /// Reactions cleared, threads removed, lock marker added
    Locked {
        /// Threads deleted by this run
        threads_deleted: usize,
    },
    /// The request message was deleted after reaching the report threshold
    Deleted,
    /// A platform call failed; the transition was aborted
    Failed(PlatformCallFailure),
}

impl Outcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored(_) => "ignored",
            Self::Rejected(rejection) => rejection.label(),
            Self::ReactionsAttached => "reactions_attached",
            Self::Claimed { .. } => "claimed",
            Self::Locked { .. } => "locked",
            Self::Deleted => "deleted",
            Self::Failed(_) => "failed",
        }
    }
}

/// Transient state of one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    /// Snapshot loaded for a reaction event
    pub snapshot: Option<RequestSnapshot>,
    /// Derived status, updated as transitions apply
    pub status: Option<TicketStatus>,
    /// Final outcome
    pub outcome: Option<Outcome>,
}

//! Types for dynamic voice rooms.

use crate::error::{PlatformCallFailure, Rejection};
use serde::{Deserialize, Serialize};
use triage_core::event::MemberIdentity;
use triage_core::ids::ChannelId;
use triage_core::platform::ChannelInfo;

/// Name of the personal room provisioned for `member`.
#[must_use]
pub fn room_name(member: &MemberIdentity) -> String {
    format!("{}#{}", member.name, member.discriminator)
}

/// Why a voice event needed no decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceIgnoreReason {
    /// The trigger or AFK channel was left
    ProtectedChannel,
    /// The channel left is not in the managed category
    OutsideManagedCategory,
    /// The channel joined is not the trigger channel
    NotTrigger,
    /// The room left no longer exists
    RoomGone,
}

impl VoiceIgnoreReason {
    /// Short label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProtectedChannel => "protected_channel",
            Self::OutsideManagedCategory => "outside_managed_category",
            Self::NotTrigger => "not_trigger",
            Self::RoomGone => "room_gone",
        }
    }
}

/// How a voice run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// Nothing to decide
    Ignored(VoiceIgnoreReason),
    /// Declined without touching the platform
    Rejected(Rejection),
    /// A room was created and the member moved into it
    RoomCreated {
        /// The new room
        room: ChannelInfo,
    },
    /// An empty room was deleted
    RoomDeleted {
        /// The deleted room
        room: ChannelId,
    },
    /// The room still has members
    RoomKept {
        /// Members still connected
        occupancy: usize,
    },
    /// A platform call failed; the transition was aborted
    Failed(PlatformCallFailure),
}

impl VoiceOutcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored(_) => "ignored",
            Self::Rejected(rejection) => rejection.label(),
            Self::RoomCreated { .. } => "room_created",
            Self::RoomDeleted { .. } => "room_deleted",
            Self::RoomKept { .. } => "room_kept",
            Self::Failed(_) => "failed",
        }
    }
}

/// Transient state of one voice run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceState {
    /// Room the run is about
    pub room_name: Option<String>,
    /// Live occupancy read for a leave
    pub occupancy: Option<usize>,
    /// Final outcome
    pub outcome: Option<VoiceOutcome>,
}

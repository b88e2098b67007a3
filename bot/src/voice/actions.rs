//! Actions for the voice room provisioner.

use crate::error::PlatformCallFailure;
use crate::voice::types::VoiceOutcome;
use triage_core::event::{MemberIdentity, VoiceChannelRef};
use triage_core::ids::GuildId;
use triage_core::platform::ChannelInfo;

/// Actions processed by the `VoiceReducer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceAction {
    /// A member entered the trigger channel.
    MemberJoinedTrigger {
        /// Guild of the channel
        guild_id: GuildId,
        /// The joining member
        member: MemberIdentity,
        /// The channel joined
        trigger: VoiceChannelRef,
    },

    /// The trigger's category was listed.
    CategoryLoaded {
        /// Guild of the channel
        guild_id: GuildId,
        /// The joining member
        member: MemberIdentity,
        /// The channel joined
        trigger: VoiceChannelRef,
        /// Channels currently in the trigger's category
        channels: Vec<ChannelInfo>,
    },

    /// A member left a voice channel.
    MemberLeftRoom {
        /// Guild of the channel
        guild_id: GuildId,
        /// The leaving member
        member: MemberIdentity,
        /// The channel left
        room: VoiceChannelRef,
    },

    /// The room's live occupancy was read.
    OccupancyLoaded {
        /// Guild of the channel
        guild_id: GuildId,
        /// The channel left
        room: VoiceChannelRef,
        /// `None` when the room no longer exists
        occupancy: Option<usize>,
    },

    /// All platform calls of a transition succeeded.
    TransitionApplied(VoiceOutcome),

    /// A platform call failed and the transition was aborted.
    TransitionFailed(PlatformCallFailure),
}

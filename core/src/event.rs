//! Typed inbound events.
//!
//! The platform connector translates SDK payloads into these structs before
//! handing them to an engine. Engines only ever see identifiers and the few
//! fields they decide on.

use crate::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// A message was posted in a guild text channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    /// Guild the message belongs to
    pub guild_id: GuildId,
    /// Channel the message was posted in
    pub channel_id: ChannelId,
    /// The new message
    pub message_id: MessageId,
    /// Author of the message
    pub author_id: UserId,
}

/// The reacting member as seen at event time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// Nickname if set, otherwise the account name
    pub display_name: String,
    /// Roles held when the reaction was added
    pub roles: Vec<RoleId>,
}

/// A reaction was added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdded {
    /// Guild the message belongs to
    pub guild_id: GuildId,
    /// Channel holding the message
    pub channel_id: ChannelId,
    /// The reacted-to message
    pub message_id: MessageId,
    /// Who reacted
    pub user_id: UserId,
    /// Member data delivered with the event, absent outside guild context
    pub member: Option<MemberSnapshot>,
    /// Unicode emoji, or the platform's textual form for custom emoji
    pub emoji: String,
}

impl ReactionAdded {
    /// Roles of the reacting member, empty when no member data was delivered.
    #[must_use]
    pub fn roles(&self) -> &[RoleId] {
        self.member
            .as_ref()
            .map(|member| member.roles.as_slice())
            .unwrap_or_default()
    }

    /// Display name of the reacting member, falling back to the user id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.member
            .as_ref()
            .map_or_else(|| self.user_id.to_string(), |member| member.display_name.clone())
    }
}

/// Identity of a member whose voice state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberIdentity {
    /// The member's account
    pub user_id: UserId,
    /// Account name (not the nickname)
    pub name: String,
    /// Account discriminator, `"0"` for accounts without one
    pub discriminator: String,
}

/// A voice channel as referenced by a voice-state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChannelRef {
    /// Channel id
    pub id: ChannelId,
    /// Channel name at event time
    pub name: String,
    /// Parent category, if any
    pub category_id: Option<ChannelId>,
}

/// A member joined, left or moved between voice channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateChanged {
    /// Guild the voice channels belong to
    pub guild_id: GuildId,
    /// Member whose state changed
    pub member: MemberIdentity,
    /// Channel before the change, `None` when the member just connected
    pub before: Option<VoiceChannelRef>,
    /// Channel after the change, `None` when the member disconnected
    pub after: Option<VoiceChannelRef>,
}

impl VoiceStateChanged {
    /// `true` when the member ended up in a different channel than before.
    ///
    /// Mute, deafen and stream toggles also produce voice-state updates;
    /// those keep the channel unchanged.
    #[must_use]
    pub fn changed_channel(&self) -> bool {
        self.before.as_ref().map(|c| c.id) != self.after.as_ref().map(|c| c.id)
    }
}

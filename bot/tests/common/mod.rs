//! Shared fixtures for the end-to-end tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;
use triage_bot::{DeskConfig, PlatformPorts, TriageApp};
use triage_core::event::{MemberIdentity, MemberSnapshot, ReactionAdded, VoiceChannelRef, VoiceStateChanged};
use triage_core::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use triage_testing::{InMemoryGuild, test_clock};

pub const GUILD: GuildId = GuildId::new(1);
pub const BOT: UserId = UserId::new(2);

pub const REQUESTS: ChannelId = ChannelId::new(100);
pub const TRIGGER: ChannelId = ChannelId::new(200);
pub const AFK: ChannelId = ChannelId::new(201);
pub const LOBBY: ChannelId = ChannelId::new(202);
pub const CATEGORY: ChannelId = ChannelId::new(300);

pub const DEVELOPER_ROLE: RoleId = RoleId::new(500);
pub const MODERATOR_ROLE: RoleId = RoleId::new(600);

pub const CUSTOMER: UserId = UserId::new(10);
pub const MODERATORS: [UserId; 2] = [UserId::new(40), UserId::new(41)];

/// Simulated platform latency; long enough for concurrent runs to overlap.
pub const LATENCY: Duration = Duration::from_millis(3);

pub fn desk() -> DeskConfig {
    DeskConfig {
        requests_channel: REQUESTS,
        create_voice_channel: TRIGGER,
        voice_category: CATEGORY,
        afk_channel: AFK,
        developer_role: DEVELOPER_ROLE,
        moderator_role: MODERATOR_ROLE,
    }
}

/// A guild with the voice layout, the moderators and some latency.
pub fn guild() -> InMemoryGuild {
    let guild = InMemoryGuild::new(GUILD, BOT).with_latency(LATENCY);
    guild.add_channel(CATEGORY, "Voice", None);
    guild.add_channel(TRIGGER, "➕ create", Some(CATEGORY));
    guild.add_channel(AFK, "afk", Some(CATEGORY));
    guild.add_channel(LOBBY, "lobby", None);
    guild.set_role_members(MODERATOR_ROLE, MODERATORS.to_vec());
    guild.set_role_members(DEVELOPER_ROLE, developers());
    guild
}

pub fn app(guild: &InMemoryGuild) -> TriageApp {
    TriageApp::new(
        desk(),
        BOT,
        Arc::new(test_clock()),
        PlatformPorts::from_platform(Arc::new(guild.clone())),
    )
}

pub fn developer(raw: u64) -> UserId {
    UserId::new(1_000 + raw)
}

/// Everyone holding the developer role in the fixture guild.
pub fn developers() -> Vec<UserId> {
    (1..=10).map(developer).collect()
}

/// Reaction event for `user`; developers carry the developer role.
pub fn reaction(message: MessageId, emoji: &str, user: UserId, is_developer: bool) -> ReactionAdded {
    ReactionAdded {
        guild_id: GUILD,
        channel_id: REQUESTS,
        message_id: message,
        user_id: user,
        member: Some(MemberSnapshot {
            display_name: format!("member-{user}"),
            roles: if is_developer { vec![DEVELOPER_ROLE] } else { vec![] },
        }),
        emoji: emoji.to_string(),
    }
}

pub fn member(name: &str, discriminator: &str) -> MemberIdentity {
    MemberIdentity {
        user_id: UserId::new(7),
        name: name.to_string(),
        discriminator: discriminator.to_string(),
    }
}

/// Reference to a channel the guild knows about.
pub fn channel_ref(guild: &InMemoryGuild, id: ChannelId) -> VoiceChannelRef {
    let info = guild
        .channels_in(Some(CATEGORY))
        .into_iter()
        .chain(guild.channels_in(None))
        .find(|channel| channel.id == id)
        .unwrap_or_else(|| panic!("channel {id} is not in the guild"));
    VoiceChannelRef {
        id: info.id,
        name: info.name,
        category_id: info.category_id,
    }
}

pub fn voice_change(
    member: &MemberIdentity,
    before: Option<VoiceChannelRef>,
    after: Option<VoiceChannelRef>,
) -> VoiceStateChanged {
    VoiceStateChanged {
        guild_id: GUILD,
        member: member.clone(),
        before,
        after,
    }
}

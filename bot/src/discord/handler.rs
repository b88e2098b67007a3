//! Gateway event handler.
//!
//! Translates serenity payloads into typed events and hands them to the
//! engines. Nothing here decides anything.

use super::convert::{FromSdk, ToSdk};
use super::platform::DiscordPlatform;
use crate::app::{PlatformPorts, TriageApp};
use crate::config::DeskConfig;
use serenity::all::{Context, EventHandler, Message, Reaction, Ready, User, VoiceState};
use serenity::async_trait;
use std::sync::{Arc, OnceLock};
use triage_core::environment::SystemClock;
use triage_core::event::{
    MemberIdentity, MemberSnapshot, MessageCreated, ReactionAdded, VoiceChannelRef,
    VoiceStateChanged,
};
use triage_core::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};

/// Routes gateway events to a [`TriageApp`] built once the bot is ready.
pub struct Handler {
    config: DeskConfig,
    app: Arc<OnceLock<TriageApp>>,
}

impl Handler {
    /// Create a handler; `app` is filled on the first ready event.
    #[must_use]
    pub fn new(config: DeskConfig, app: Arc<OnceLock<TriageApp>>) -> Self {
        Self { config, app }
    }

    fn app(&self) -> Option<&TriageApp> {
        let app = self.app.get();
        if app.is_none() {
            tracing::debug!("Event received before ready, dropped");
        }
        app
    }
}

fn identity(user: &User) -> MemberIdentity {
    MemberIdentity {
        user_id: UserId::from_sdk(user.id),
        name: user.name.clone(),
        discriminator: user
            .discriminator
            .map_or_else(|| "0".to_string(), |d| format!("{:04}", d.get())),
    }
}

fn voice_channel(ctx: &Context, guild: GuildId, state: &VoiceState) -> Option<VoiceChannelRef> {
    let channel = state.channel_id?;
    let guild = ctx.cache.guild(guild.to_sdk())?;
    let cached = guild.channels.get(&channel)?;
    Some(VoiceChannelRef {
        id: ChannelId::from_sdk(channel),
        name: cached.name.clone(),
        category_id: cached.parent_id.map(ChannelId::from_sdk),
    })
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.tag(), guilds = ready.guilds.len(), "Logged in as {}", ready.user.name);

        let platform = Arc::new(DiscordPlatform::new(
            Arc::clone(&ctx.http),
            Arc::clone(&ctx.cache),
        ));
        let app = TriageApp::new(
            self.config.clone(),
            UserId::from_sdk(ready.user.id),
            Arc::new(SystemClock),
            PlatformPorts::from_platform(platform),
        );
        if self.app.set(app).is_err() {
            tracing::debug!("Reconnected, keeping existing engines");
        }
    }

    async fn message(&self, _ctx: Context, message: Message) {
        let (Some(app), Some(guild_id)) = (self.app(), message.guild_id) else {
            return;
        };
        app.on_message(MessageCreated {
            guild_id: GuildId::from_sdk(guild_id),
            channel_id: ChannelId::from_sdk(message.channel_id),
            message_id: MessageId::from_sdk(message.id),
            author_id: UserId::from_sdk(message.author.id),
        });
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        let (Some(app), Some(guild_id), Some(user_id)) =
            (self.app(), reaction.guild_id, reaction.user_id)
        else {
            return;
        };
        let member = reaction.member.as_ref().map(|member| MemberSnapshot {
            display_name: member.display_name().to_string(),
            roles: member.roles.iter().copied().map(RoleId::from_sdk).collect(),
        });

        app.on_reaction_added(ReactionAdded {
            guild_id: GuildId::from_sdk(guild_id),
            channel_id: ChannelId::from_sdk(reaction.channel_id),
            message_id: MessageId::from_sdk(reaction.message_id),
            user_id: UserId::from_sdk(user_id),
            member,
            emoji: reaction.emoji.to_string(),
        });
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let (Some(app), Some(guild_id)) = (self.app(), new.guild_id) else {
            return;
        };
        let guild = GuildId::from_sdk(guild_id);

        let user = match &new.member {
            Some(member) => member.user.clone(),
            None => match ctx.cache.user(new.user_id) {
                Some(user) => (*user).clone(),
                None => {
                    tracing::debug!(user = %new.user_id, "Voice update for uncached user, dropped");
                    return;
                },
            },
        };

        app.on_voice_state_changed(VoiceStateChanged {
            guild_id: guild,
            member: identity(&user),
            before: old.as_ref().and_then(|state| voice_channel(&ctx, guild, state)),
            after: voice_channel(&ctx, guild, &new),
        });
    }
}

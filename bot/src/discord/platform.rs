//! Platform ports over serenity's HTTP client and gateway cache.

use super::convert::{FromSdk, ToSdk};
use serenity::all::{
    AutoArchiveDuration, Cache, ChannelType, CreateChannel, CreateThread, GuildChannel, Http,
    ReactionType,
};
use std::sync::Arc;
use triage_core::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use triage_core::platform::{
    ChannelInfo, FetchedMessage, FetchedReaction, MemberDirectory, PlatformError, PlatformFuture,
    RequestChannel, ThreadDirectory, ThreadInfo, VoiceDirectory,
};

/// Most reactors fetched per emoji.
const REACTION_PAGE: u8 = 100;

/// The live chat platform.
///
/// Writes and message reads go through HTTP. Role membership and voice
/// occupancy are read from the gateway cache, which the platform keeps
/// current through member and voice-state events.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    /// Wrap a connected client's HTTP handle and cache.
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

/// Map a serenity error onto the engines' taxonomy.
fn platform_error(error: serenity::Error) -> PlatformError {
    match &error {
        serenity::Error::Http(http) => match http.status_code().map(|status| status.as_u16()) {
            Some(404) => PlatformError::NotFound,
            Some(403) => PlatformError::Forbidden,
            Some(429) => PlatformError::RateLimited,
            _ => PlatformError::Transport(error.to_string()),
        },
        _ => PlatformError::Transport(error.to_string()),
    }
}

fn thread_info(channel: GuildChannel) -> ThreadInfo {
    ThreadInfo {
        id: ChannelId::from_sdk(channel.id),
        name: channel.name,
        parent_id: channel.parent_id.map(ChannelId::from_sdk),
    }
}

fn channel_info(channel: GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: ChannelId::from_sdk(channel.id),
        name: channel.name,
        category_id: channel.parent_id.map(ChannelId::from_sdk),
    }
}

impl RequestChannel for DiscordPlatform {
    fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformFuture<'_, Option<FetchedMessage>> {
        Box::pin(async move {
            let fetched = match self.http.get_message(channel.to_sdk(), message.to_sdk()).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    return match platform_error(error) {
                        PlatformError::NotFound => Ok(None),
                        other => Err(other),
                    };
                },
            };

            let mut reactions = Vec::with_capacity(fetched.reactions.len());
            for reaction in &fetched.reactions {
                let users = self
                    .http
                    .get_reaction_users(
                        fetched.channel_id,
                        fetched.id,
                        &reaction.reaction_type,
                        REACTION_PAGE,
                        None,
                    )
                    .await
                    .map_err(platform_error)?;
                reactions.push(FetchedReaction {
                    emoji: reaction.reaction_type.to_string(),
                    users: users.into_iter().map(|user| UserId::from_sdk(user.id)).collect(),
                });
            }

            Ok(Some(FetchedMessage {
                id: message,
                channel_id: channel,
                mentions: fetched
                    .mentions
                    .iter()
                    .map(|user| UserId::from_sdk(user.id))
                    .collect(),
                reactions,
            }))
        })
    }

    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .create_reaction(channel.to_sdk(), message.to_sdk(), &ReactionType::Unicode(emoji))
                .await
                .map_err(platform_error)
        })
    }

    fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: String,
        user: UserId,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .delete_reaction(
                    channel.to_sdk(),
                    message.to_sdk(),
                    user.to_sdk(),
                    &ReactionType::Unicode(emoji),
                )
                .await
                .map_err(platform_error)
        })
    }

    fn clear_reactions(&self, channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .delete_message_reactions(channel.to_sdk(), message.to_sdk())
                .await
                .map_err(platform_error)
        })
    }

    fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .delete_message(channel.to_sdk(), message.to_sdk(), None)
                .await
                .map_err(platform_error)
        })
    }
}

impl ThreadDirectory for DiscordPlatform {
    fn create_thread(
        &self,
        parent: ChannelId,
        name: String,
        auto_archive_minutes: u16,
    ) -> PlatformFuture<'_, ThreadInfo> {
        Box::pin(async move {
            let duration = match auto_archive_minutes {
                60 => AutoArchiveDuration::OneHour,
                1440 => AutoArchiveDuration::OneDay,
                4320 => AutoArchiveDuration::ThreeDays,
                _ => AutoArchiveDuration::OneWeek,
            };
            let builder = CreateThread::new(name)
                .kind(ChannelType::PrivateThread)
                .auto_archive_duration(duration);

            parent
                .to_sdk()
                .create_thread(self.http.as_ref(), builder)
                .await
                .map(thread_info)
                .map_err(platform_error)
        })
    }

    fn add_thread_member(&self, thread: ChannelId, user: UserId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .add_thread_channel_member(thread.to_sdk(), user.to_sdk())
                .await
                .map_err(platform_error)
        })
    }

    fn active_threads(&self, guild: GuildId) -> PlatformFuture<'_, Vec<ThreadInfo>> {
        Box::pin(async move {
            let data = self
                .http
                .get_guild_active_threads(guild.to_sdk())
                .await
                .map_err(platform_error)?;
            Ok(data.threads.into_iter().map(thread_info).collect())
        })
    }

    fn delete_thread(&self, thread: ChannelId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .delete_channel(thread.to_sdk(), None)
                .await
                .map(|_| ())
                .map_err(platform_error)
        })
    }
}

impl MemberDirectory for DiscordPlatform {
    fn role_members(&self, guild: GuildId, role: RoleId) -> PlatformFuture<'_, Vec<UserId>> {
        Box::pin(async move {
            let role = role.to_sdk();
            let guild = self.cache.guild(guild.to_sdk()).ok_or(PlatformError::NotFound)?;
            Ok(guild
                .members
                .values()
                .filter(|member| member.roles.contains(&role))
                .map(|member| UserId::from_sdk(member.user.id))
                .collect())
        })
    }
}

impl VoiceDirectory for DiscordPlatform {
    fn category_channels(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
    ) -> PlatformFuture<'_, Vec<ChannelInfo>> {
        Box::pin(async move {
            let parent = category.map(ToSdk::to_sdk);
            let channels = guild
                .to_sdk()
                .channels(self.http.as_ref())
                .await
                .map_err(platform_error)?;
            Ok(channels
                .into_values()
                .filter(|channel| channel.parent_id == parent)
                .map(channel_info)
                .collect())
        })
    }

    fn create_voice_channel(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
        name: String,
    ) -> PlatformFuture<'_, ChannelInfo> {
        Box::pin(async move {
            let mut builder = CreateChannel::new(name).kind(ChannelType::Voice);
            if let Some(category) = category {
                builder = builder.category(category.to_sdk());
            }
            guild
                .to_sdk()
                .create_channel(self.http.as_ref(), builder)
                .await
                .map(channel_info)
                .map_err(platform_error)
        })
    }

    fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            guild
                .to_sdk()
                .move_member(self.http.as_ref(), user.to_sdk(), channel.to_sdk())
                .await
                .map(|_| ())
                .map_err(platform_error)
        })
    }

    fn channel_occupancy(&self, guild: GuildId, channel: ChannelId) -> PlatformFuture<'_, usize> {
        Box::pin(async move {
            let channel = channel.to_sdk();
            let guild = self.cache.guild(guild.to_sdk()).ok_or(PlatformError::NotFound)?;
            if !guild.channels.contains_key(&channel) {
                return Err(PlatformError::NotFound);
            }
            Ok(guild
                .voice_states
                .values()
                .filter(|state| state.channel_id == Some(channel))
                .count())
        })
    }

    fn delete_channel(&self, channel: ChannelId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.http
                .delete_channel(channel.to_sdk(), None)
                .await
                .map(|_| ())
                .map_err(platform_error)
        })
    }
}

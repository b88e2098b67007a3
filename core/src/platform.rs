//! Platform ports.
//!
//! The engines reach the chat platform only through these traits. The
//! platform is the system of record: every read here is live, nothing is
//! cached by the engines between events.
//!
//! # Implementations
//!
//! - `DiscordPlatform` (in `triage-bot`, `discord` feature): serenity HTTP + cache
//! - `InMemoryGuild` (in `triage-testing`): deterministic double with call log
//!   and failure injection
//!
//! # Dyn Compatibility
//!
//! Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so the
//! ports can be held as `Arc<dyn …>` and captured by effects.

use crate::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors surfaced by platform calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The target object does not exist (anymore).
    #[error("not found")]
    NotFound,

    /// The bot lacks permission for the call.
    #[error("forbidden")]
    Forbidden,

    /// The platform rate limited the call.
    #[error("rate limited")]
    RateLimited,

    /// The call did not complete in time.
    #[error("timed out")]
    Timeout,

    /// Any other transport or API failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result of a platform call.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Boxed future returned by every port method.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = PlatformResult<T>> + Send + 'a>>;

/// Users who reacted with one emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedReaction {
    /// Unicode emoji or textual custom emoji
    pub emoji: String,
    /// Reacting users, in platform order
    pub users: Vec<UserId>,
}

/// A message as currently stored by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedMessage {
    /// Message id
    pub id: MessageId,
    /// Channel holding the message
    pub channel_id: ChannelId,
    /// Users mentioned in the body, in order of appearance
    pub mentions: Vec<UserId>,
    /// Current reactions with their reactors
    pub reactions: Vec<FetchedReaction>,
}

/// A thread channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    /// Thread channel id
    pub id: ChannelId,
    /// Thread name
    pub name: String,
    /// Channel the thread was started in
    pub parent_id: Option<ChannelId>,
}

/// A guild channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel id
    pub id: ChannelId,
    /// Channel name
    pub name: String,
    /// Parent category, if any
    pub category_id: Option<ChannelId>,
}

/// Messages and their reactions.
pub trait RequestChannel: Send + Sync {
    /// Fetch a message with its mentions and reactors.
    ///
    /// Returns `Ok(None)` when the message no longer exists.
    ///
    /// # Errors
    ///
    /// Any [`PlatformError`] other than a missing message.
    fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformFuture<'_, Option<FetchedMessage>>;

    /// React to a message as the bot.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    ) -> PlatformFuture<'_, ()>;

    /// Remove one user's reaction.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: String,
        user: UserId,
    ) -> PlatformFuture<'_, ()>;

    /// Remove every reaction from a message.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn clear_reactions(&self, channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()>;

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] if it was already gone.
    fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()>;
}

/// Threads of a guild.
pub trait ThreadDirectory: Send + Sync {
    /// Start a thread under `parent`.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn create_thread(
        &self,
        parent: ChannelId,
        name: String,
        auto_archive_minutes: u16,
    ) -> PlatformFuture<'_, ThreadInfo>;

    /// Add a user to a thread.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn add_thread_member(&self, thread: ChannelId, user: UserId) -> PlatformFuture<'_, ()>;

    /// All threads of the guild that are currently active.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn active_threads(&self, guild: GuildId) -> PlatformFuture<'_, Vec<ThreadInfo>>;

    /// Delete a thread.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] if it was already gone.
    fn delete_thread(&self, thread: ChannelId) -> PlatformFuture<'_, ()>;
}

/// Guild membership.
pub trait MemberDirectory: Send + Sync {
    /// Members currently holding `role`.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn role_members(&self, guild: GuildId, role: RoleId) -> PlatformFuture<'_, Vec<UserId>>;
}

/// Voice channels of a guild.
pub trait VoiceDirectory: Send + Sync {
    /// Channels whose parent is `category` (`None`: channels without a category).
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn category_channels(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
    ) -> PlatformFuture<'_, Vec<ChannelInfo>>;

    /// Create a voice channel.
    ///
    /// # Errors
    ///
    /// Returns the platform failure.
    fn create_voice_channel(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
        name: String,
    ) -> PlatformFuture<'_, ChannelInfo>;

    /// Move a connected member into `channel`.
    ///
    /// # Errors
    ///
    /// Returns the platform failure, e.g. when the member already disconnected.
    fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> PlatformFuture<'_, ()>;

    /// Number of members currently connected to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] if the channel does not exist.
    fn channel_occupancy(&self, guild: GuildId, channel: ChannelId) -> PlatformFuture<'_, usize>;

    /// Delete a channel.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] if it was already gone.
    fn delete_channel(&self, channel: ChannelId) -> PlatformFuture<'_, ()>;
}

/// Treat `NotFound` as success for deletions.
///
/// Deleting something that is already gone leaves the platform in the
/// requested state.
///
/// # Errors
///
/// Every error except [`PlatformError::NotFound`].
pub fn tolerate_missing(result: PlatformResult<()>) -> PlatformResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(PlatformError::NotFound) => Ok(false),
        Err(other) => Err(other),
    }
}

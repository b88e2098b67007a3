//! In-memory guild implementing every platform port.
//!
//! Used by reducer and end-to-end tests. Each call is recorded in a call log,
//! failures can be injected per operation, and an optional latency makes
//! concurrent runs interleave the way they do against the live platform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use triage_core::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use triage_core::platform::{
    ChannelInfo, FetchedMessage, FetchedReaction, MemberDirectory, PlatformError, PlatformFuture,
    PlatformResult, RequestChannel, ThreadDirectory, ThreadInfo, VoiceDirectory,
};

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// `RequestChannel::fetch_message`
    FetchMessage(MessageId),
    /// `RequestChannel::add_reaction`
    AddReaction {
        /// Target message
        message: MessageId,
        /// Emoji added by the bot
        emoji: String,
    },
    /// `RequestChannel::remove_reaction`
    RemoveReaction {
        /// Target message
        message: MessageId,
        /// Emoji removed
        emoji: String,
        /// Whose reaction was removed
        user: UserId,
    },
    /// `RequestChannel::clear_reactions`
    ClearReactions(MessageId),
    /// `RequestChannel::delete_message`
    DeleteMessage(MessageId),
    /// `ThreadDirectory::create_thread`
    CreateThread {
        /// Parent channel
        parent: ChannelId,
        /// Thread name
        name: String,
    },
    /// `ThreadDirectory::add_thread_member`
    AddThreadMember {
        /// Thread
        thread: ChannelId,
        /// Added user
        user: UserId,
    },
    /// `ThreadDirectory::active_threads`
    ActiveThreads,
    /// `ThreadDirectory::delete_thread`
    DeleteThread(ChannelId),
    /// `MemberDirectory::role_members`
    RoleMembers(RoleId),
    /// `VoiceDirectory::category_channels`
    CategoryChannels(Option<ChannelId>),
    /// `VoiceDirectory::create_voice_channel`
    CreateVoiceChannel {
        /// Parent category
        category: Option<ChannelId>,
        /// Channel name
        name: String,
    },
    /// `VoiceDirectory::move_member`
    MoveMember {
        /// Moved user
        user: UserId,
        /// Destination channel
        channel: ChannelId,
    },
    /// `VoiceDirectory::channel_occupancy`
    ChannelOccupancy(ChannelId),
    /// `VoiceDirectory::delete_channel`
    DeleteChannel(ChannelId),
}

#[derive(Debug)]
struct StoredMessage {
    channel_id: ChannelId,
    mentions: Vec<UserId>,
    reactions: Vec<FetchedReaction>,
}

#[derive(Debug)]
struct StoredThread {
    info: ThreadInfo,
    members: Vec<UserId>,
    auto_archive_minutes: u16,
}

#[derive(Debug)]
struct GuildState {
    next_id: u64,
    messages: HashMap<MessageId, StoredMessage>,
    threads: Vec<StoredThread>,
    role_members: HashMap<RoleId, Vec<UserId>>,
    channels: Vec<ChannelInfo>,
    voice: HashMap<UserId, ChannelId>,
    calls: Vec<PlatformCall>,
    failures: HashMap<&'static str, PlatformError>,
}

impl GuildState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, operation: &'static str) -> PlatformResult<()> {
        self.failures.get(operation).cloned().map_or(Ok(()), Err)
    }

    fn message_mut(&mut self, message: MessageId) -> PlatformResult<&mut StoredMessage> {
        self.messages.get_mut(&message).ok_or(PlatformError::NotFound)
    }
}

/// A single guild held in memory.
///
/// Cloning shares the underlying state, so a test can keep one handle for
/// seeding and inspection while the engines use another.
#[derive(Debug, Clone)]
pub struct InMemoryGuild {
    guild_id: GuildId,
    bot_id: UserId,
    latency: Option<Duration>,
    state: Arc<Mutex<GuildState>>,
}

impl InMemoryGuild {
    /// Empty guild; reactions added through the ports are attributed to `bot_id`.
    #[must_use]
    pub fn new(guild_id: GuildId, bot_id: UserId) -> Self {
        Self {
            guild_id,
            bot_id,
            latency: None,
            state: Arc::new(Mutex::new(GuildState {
                next_id: 900_000,
                messages: HashMap::new(),
                threads: Vec::new(),
                role_members: HashMap::new(),
                channels: Vec::new(),
                voice: HashMap::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
            })),
        }
    }

    /// Delay every port call by `latency` before it takes effect.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The guild id.
    #[must_use]
    pub const fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// The bot's user id.
    #[must_use]
    pub const fn bot_id(&self) -> UserId {
        self.bot_id
    }

    fn lock(&self) -> MutexGuard<'_, GuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    // ----- seeding -----

    /// Store a message with the given mentions and no reactions.
    pub fn post_message(&self, channel: ChannelId, message: MessageId, mentions: Vec<UserId>) {
        self.lock().messages.insert(
            message,
            StoredMessage {
                channel_id: channel,
                mentions,
                reactions: Vec::new(),
            },
        );
    }

    /// Record `user` as reacting with `emoji`, as the platform does before
    /// delivering the reaction event.
    pub fn react(&self, message: MessageId, emoji: &str, user: UserId) {
        if let Some(stored) = self.lock().messages.get_mut(&message) {
            add_reactor(&mut stored.reactions, emoji, user);
        }
    }

    /// Replace the members holding `role`.
    pub fn set_role_members(&self, role: RoleId, members: Vec<UserId>) {
        self.lock().role_members.insert(role, members);
    }

    /// Add a channel (text, voice or category) with a fixed id.
    pub fn add_channel(&self, id: ChannelId, name: &str, category: Option<ChannelId>) -> ChannelInfo {
        let info = ChannelInfo {
            id,
            name: name.to_string(),
            category_id: category,
        };
        self.lock().channels.push(info.clone());
        info
    }

    /// Add an existing thread.
    pub fn add_thread(&self, name: &str, parent: ChannelId) -> ThreadInfo {
        let mut state = self.lock();
        let info = ThreadInfo {
            id: ChannelId::new(state.allocate()),
            name: name.to_string(),
            parent_id: Some(parent),
        };
        state.threads.push(StoredThread {
            info: info.clone(),
            members: Vec::new(),
            auto_archive_minutes: 0,
        });
        info
    }

    /// Connect `user` to a voice channel.
    pub fn connect_voice(&self, user: UserId, channel: ChannelId) {
        self.lock().voice.insert(user, channel);
    }

    /// Disconnect `user` from voice.
    pub fn disconnect_voice(&self, user: UserId) {
        self.lock().voice.remove(&user);
    }

    /// Make every call of `operation` (port method name) fail with `error`.
    pub fn fail_on(&self, operation: &'static str, error: PlatformError) {
        self.lock().failures.insert(operation, error);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    // ----- inspection -----

    /// Current state of a message.
    #[must_use]
    pub fn message(&self, message: MessageId) -> Option<FetchedMessage> {
        self.lock().messages.get(&message).map(|stored| FetchedMessage {
            id: message,
            channel_id: stored.channel_id,
            mentions: stored.mentions.clone(),
            reactions: stored.reactions.clone(),
        })
    }

    /// Users currently reacting to `message` with `emoji`.
    #[must_use]
    pub fn reactors(&self, message: MessageId, emoji: &str) -> Vec<UserId> {
        self.message(message)
            .and_then(|fetched| fetched.reactions.into_iter().find(|r| r.emoji == emoji))
            .map(|reaction| reaction.users)
            .unwrap_or_default()
    }

    /// All threads, in creation order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadInfo> {
        self.lock().threads.iter().map(|t| t.info.clone()).collect()
    }

    /// Members added to a thread, in order.
    #[must_use]
    pub fn thread_members(&self, thread: ChannelId) -> Vec<UserId> {
        self.lock()
            .threads
            .iter()
            .find(|t| t.info.id == thread)
            .map(|t| t.members.clone())
            .unwrap_or_default()
    }

    /// Auto-archive duration a thread was created with.
    #[must_use]
    pub fn thread_auto_archive(&self, thread: ChannelId) -> Option<u16> {
        self.lock()
            .threads
            .iter()
            .find(|t| t.info.id == thread)
            .map(|t| t.auto_archive_minutes)
    }

    /// Channels under `category`.
    #[must_use]
    pub fn channels_in(&self, category: Option<ChannelId>) -> Vec<ChannelInfo> {
        self.lock()
            .channels
            .iter()
            .filter(|c| c.category_id == category)
            .cloned()
            .collect()
    }

    /// Channels with exactly this name.
    #[must_use]
    pub fn channels_named(&self, name: &str) -> Vec<ChannelInfo> {
        self.lock()
            .channels
            .iter()
            .filter(|c| c.name == name)
            .cloned()
            .collect()
    }

    /// Voice channel `user` is connected to.
    #[must_use]
    pub fn voice_channel_of(&self, user: UserId) -> Option<ChannelId> {
        self.lock().voice.get(&user).copied()
    }

    /// Every call made through the ports, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

fn add_reactor(reactions: &mut Vec<FetchedReaction>, emoji: &str, user: UserId) {
    match reactions.iter_mut().find(|r| r.emoji == emoji) {
        Some(reaction) if reaction.users.contains(&user) => {},
        Some(reaction) => reaction.users.push(user),
        None => reactions.push(FetchedReaction {
            emoji: emoji.to_string(),
            users: vec![user],
        }),
    }
}

impl RequestChannel for InMemoryGuild {
    fn fetch_message(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> PlatformFuture<'_, Option<FetchedMessage>> {
        Box::pin(async move {
            self.pause().await;
            {
                let mut state = self.lock();
                state.calls.push(PlatformCall::FetchMessage(message));
                state.check("fetch_message")?;
            }
            Ok(self.message(message))
        })
    }

    fn add_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: String,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::AddReaction {
                message,
                emoji: emoji.clone(),
            });
            state.check("add_reaction")?;
            let bot = self.bot_id;
            let stored = state.message_mut(message)?;
            add_reactor(&mut stored.reactions, &emoji, bot);
            Ok(())
        })
    }

    fn remove_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: String,
        user: UserId,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::RemoveReaction {
                message,
                emoji: emoji.clone(),
                user,
            });
            state.check("remove_reaction")?;
            let stored = state.message_mut(message)?;
            for reaction in &mut stored.reactions {
                if reaction.emoji == emoji {
                    reaction.users.retain(|u| *u != user);
                }
            }
            stored.reactions.retain(|r| !r.users.is_empty());
            Ok(())
        })
    }

    fn clear_reactions(&self, _channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::ClearReactions(message));
            state.check("clear_reactions")?;
            state.message_mut(message)?.reactions.clear();
            Ok(())
        })
    }

    fn delete_message(&self, _channel: ChannelId, message: MessageId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::DeleteMessage(message));
            state.check("delete_message")?;
            state
                .messages
                .remove(&message)
                .map(|_| ())
                .ok_or(PlatformError::NotFound)
        })
    }
}

impl ThreadDirectory for InMemoryGuild {
    fn create_thread(
        &self,
        parent: ChannelId,
        name: String,
        auto_archive_minutes: u16,
    ) -> PlatformFuture<'_, ThreadInfo> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::CreateThread {
                parent,
                name: name.clone(),
            });
            state.check("create_thread")?;
            let info = ThreadInfo {
                id: ChannelId::new(state.allocate()),
                name,
                parent_id: Some(parent),
            };
            state.threads.push(StoredThread {
                info: info.clone(),
                members: Vec::new(),
                auto_archive_minutes,
            });
            Ok(info)
        })
    }

    fn add_thread_member(&self, thread: ChannelId, user: UserId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::AddThreadMember { thread, user });
            state.check("add_thread_member")?;
            let stored = state
                .threads
                .iter_mut()
                .find(|t| t.info.id == thread)
                .ok_or(PlatformError::NotFound)?;
            if !stored.members.contains(&user) {
                stored.members.push(user);
            }
            Ok(())
        })
    }

    fn active_threads(&self, _guild: GuildId) -> PlatformFuture<'_, Vec<ThreadInfo>> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::ActiveThreads);
            state.check("active_threads")?;
            Ok(state.threads.iter().map(|t| t.info.clone()).collect())
        })
    }

    fn delete_thread(&self, thread: ChannelId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::DeleteThread(thread));
            state.check("delete_thread")?;
            let before = state.threads.len();
            state.threads.retain(|t| t.info.id != thread);
            if state.threads.len() == before {
                return Err(PlatformError::NotFound);
            }
            Ok(())
        })
    }
}

impl MemberDirectory for InMemoryGuild {
    fn role_members(&self, _guild: GuildId, role: RoleId) -> PlatformFuture<'_, Vec<UserId>> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::RoleMembers(role));
            state.check("role_members")?;
            Ok(state.role_members.get(&role).cloned().unwrap_or_default())
        })
    }
}

impl VoiceDirectory for InMemoryGuild {
    fn category_channels(
        &self,
        _guild: GuildId,
        category: Option<ChannelId>,
    ) -> PlatformFuture<'_, Vec<ChannelInfo>> {
        Box::pin(async move {
            self.pause().await;
            {
                let mut state = self.lock();
                state.calls.push(PlatformCall::CategoryChannels(category));
                state.check("category_channels")?;
            }
            Ok(self.channels_in(category))
        })
    }

    fn create_voice_channel(
        &self,
        _guild: GuildId,
        category: Option<ChannelId>,
        name: String,
    ) -> PlatformFuture<'_, ChannelInfo> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::CreateVoiceChannel {
                category,
                name: name.clone(),
            });
            state.check("create_voice_channel")?;
            let info = ChannelInfo {
                id: ChannelId::new(state.allocate()),
                name,
                category_id: category,
            };
            state.channels.push(info.clone());
            Ok(info)
        })
    }

    fn move_member(
        &self,
        _guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::MoveMember { user, channel });
            state.check("move_member")?;
            if !state.channels.iter().any(|c| c.id == channel) {
                return Err(PlatformError::NotFound);
            }
            match state.voice.get_mut(&user) {
                Some(current) => {
                    *current = channel;
                    Ok(())
                },
                None => Err(PlatformError::Transport(
                    "target user is not connected to voice".to_string(),
                )),
            }
        })
    }

    fn channel_occupancy(&self, _guild: GuildId, channel: ChannelId) -> PlatformFuture<'_, usize> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::ChannelOccupancy(channel));
            state.check("channel_occupancy")?;
            if !state.channels.iter().any(|c| c.id == channel) {
                return Err(PlatformError::NotFound);
            }
            Ok(state.voice.values().filter(|c| **c == channel).count())
        })
    }

    fn delete_channel(&self, channel: ChannelId) -> PlatformFuture<'_, ()> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.lock();
            state.calls.push(PlatformCall::DeleteChannel(channel));
            state.check("delete_channel")?;
            let before = state.channels.len();
            state.channels.retain(|c| c.id != channel);
            if state.channels.len() == before {
                return Err(PlatformError::NotFound);
            }
            state.voice.retain(|_, c| *c != channel);
            Ok(())
        })
    }
}

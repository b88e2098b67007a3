//! Thread lifecycle for request tickets.
//!
//! A claimed request gets one thread named `{actor}>{request id}>{timestamp}`.
//! The request id in the name is the only link between the two: threads are
//! found again by substring match on the id.

use crate::error::{During, PlatformCallFailure};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use triage_core::ids::{ChannelId, GuildId, MessageId, UserId};
use triage_core::platform::{ThreadDirectory, ThreadInfo, tolerate_missing};

/// Longest auto-archive duration the platform accepts (7 days).
pub const THREAD_AUTO_ARCHIVE_MINUTES: u16 = 10_080;

/// Name for a thread claimed by `actor` on `request` at `created_at`.
#[must_use]
pub fn thread_name(actor: &str, request: MessageId, created_at: DateTime<Utc>) -> String {
    format!(
        "{actor}>{request}>{}",
        created_at.format("%Y-%m-%d %H:%M:%S%.6f")
    )
}

/// `true` when the thread name references `request`.
#[must_use]
pub fn names_request(thread: &ThreadInfo, request: MessageId) -> bool {
    thread.name.contains(&request.to_string())
}

/// Creates, populates and sweeps request threads.
#[derive(Clone)]
pub struct ThreadLifecycle {
    directory: Arc<dyn ThreadDirectory>,
}

impl ThreadLifecycle {
    /// Wrap a thread directory.
    #[must_use]
    pub fn new(directory: Arc<dyn ThreadDirectory>) -> Self {
        Self { directory }
    }

    /// Start a thread under `parent` with the longest auto-archive duration.
    ///
    /// # Errors
    ///
    /// Returns the failed platform call.
    pub async fn create_thread(
        &self,
        parent: ChannelId,
        name: String,
    ) -> Result<ThreadInfo, PlatformCallFailure> {
        self.directory
            .create_thread(parent, name, THREAD_AUTO_ARCHIVE_MINUTES)
            .await
            .during("create_thread")
    }

    /// Add one participant.
    ///
    /// # Errors
    ///
    /// Returns the failed platform call.
    pub async fn add_participant(
        &self,
        thread: ChannelId,
        user: UserId,
    ) -> Result<(), PlatformCallFailure> {
        self.directory
            .add_thread_member(thread, user)
            .await
            .during("add_thread_member")
    }

    /// Add participants in order, skipping repeats. Returns how many were added.
    ///
    /// # Errors
    ///
    /// Stops at the first failed platform call.
    pub async fn add_participants<I>(
        &self,
        thread: ChannelId,
        users: I,
    ) -> Result<usize, PlatformCallFailure>
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut added: Vec<UserId> = Vec::new();
        for user in users {
            if added.contains(&user) {
                continue;
            }
            self.add_participant(thread, user).await?;
            added.push(user);
        }
        Ok(added.len())
    }

    /// Active threads of the guild that reference `request`.
    ///
    /// # Errors
    ///
    /// Returns the failed platform call.
    pub async fn threads_for_request(
        &self,
        guild: GuildId,
        request: MessageId,
    ) -> Result<Vec<ThreadInfo>, PlatformCallFailure> {
        let threads = self
            .directory
            .active_threads(guild)
            .await
            .during("active_threads")?;
        Ok(threads
            .into_iter()
            .filter(|thread| names_request(thread, request))
            .collect())
    }

    /// Delete every active thread matching `predicate`.
    ///
    /// Threads that vanish between listing and deletion count as deleted
    /// by someone else and are skipped. Returns how many this call deleted.
    ///
    /// # Errors
    ///
    /// Stops at the first failed platform call.
    pub async fn delete_threads_matching<P>(
        &self,
        guild: GuildId,
        predicate: P,
    ) -> Result<usize, PlatformCallFailure>
    where
        P: Fn(&ThreadInfo) -> bool + Send + Sync,
    {
        let threads = self
            .directory
            .active_threads(guild)
            .await
            .during("active_threads")?;

        let mut deleted = 0;
        for thread in threads.iter().filter(|thread| predicate(thread)) {
            if self.delete_thread(thread.id).await? {
                tracing::debug!(thread = %thread.id, name = %thread.name, "Thread deleted");
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Delete one thread. Returns `false` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns the failed platform call.
    pub async fn delete_thread(&self, thread: ChannelId) -> Result<bool, PlatformCallFailure> {
        tolerate_missing(self.directory.delete_thread(thread).await).during("delete_thread")
    }

    /// Delete every thread that references `request`.
    ///
    /// # Errors
    ///
    /// Stops at the first failed platform call.
    pub async fn delete_request_threads(
        &self,
        guild: GuildId,
        request: MessageId,
    ) -> Result<usize, PlatformCallFailure> {
        self.delete_threads_matching(guild, move |thread| names_request(thread, request))
            .await
    }
}

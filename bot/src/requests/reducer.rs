//! Reducer for the request ticket workflow.

use crate::authorization::require_role;
use crate::error::{During, PlatformCallFailure, Rejection};
use crate::requests::{
    IgnoreReason, LOCK_MARKER, Outcome, REPORT_THRESHOLD, ReactionSet, ReactionSymbol,
    RequestAction, RequestEnvironment, RequestSnapshot, RequestState, TicketStatus,
};
use crate::threads::{ThreadLifecycle, thread_name};
use smallvec::{SmallVec, smallvec};
use std::future::Future;
use std::sync::Arc;
use triage_core::event::{MessageCreated, ReactionAdded};
use triage_core::ids::UserId;
use triage_core::platform::{RequestChannel, tolerate_missing};
use triage_core::{effect::Effect, reducer::Reducer};

type Effects = SmallVec<[Effect<RequestAction>; 4]>;

/// Reducer for request tickets.
///
/// A reaction run goes through two steps:
/// 1. `ReactionAdded` passes the cheap filters (own reaction, channel,
///    alphabet) and loads a [`RequestSnapshot`] from the platform.
/// 2. `SnapshotLoaded` derives the ticket status, checks the customer, the
///    lock guard and the actor's authorization, and returns the platform
///    calls of the chosen transition as one effect.
///
/// The transition effect reports back with `TransitionApplied` or
/// `TransitionFailed`, which records the run's [`Outcome`].
pub struct RequestReducer;

impl RequestReducer {
    /// Create a new request reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RequestReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RequestReducer {
    type State = RequestState;
    type Action = RequestAction;
    type Environment = RequestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            RequestAction::RequestPosted(message) => on_request_posted(state, &message, env),

            RequestAction::ReactionAdded(reaction) => on_reaction_added(state, reaction, env),

            RequestAction::SnapshotLoaded {
                snapshot: None, ..
            } => {
                state.status = Some(TicketStatus::Deleted);
                finish(state, Outcome::Ignored(IgnoreReason::MessageGone));
                smallvec![Effect::None]
            },

            RequestAction::SnapshotLoaded {
                reaction,
                snapshot: Some(snapshot),
            } => decide(state, reaction, snapshot, env),

            RequestAction::TransitionApplied(outcome) => {
                match &outcome {
                    Outcome::Claimed { .. } => state.status = Some(TicketStatus::Claimed),
                    Outcome::Locked { .. } => state.status = Some(TicketStatus::Locked),
                    Outcome::Deleted => state.status = Some(TicketStatus::Deleted),
                    _ => {},
                }
                finish(state, outcome);
                smallvec![Effect::None]
            },

            RequestAction::TransitionFailed(failure) => {
                finish(state, Outcome::Failed(failure));
                smallvec![Effect::None]
            },
        }
    }
}

fn on_request_posted(
    state: &mut RequestState,
    message: &MessageCreated,
    env: &RequestEnvironment,
) -> Effects {
    if message.author_id == env.identity {
        finish(state, Outcome::Ignored(IgnoreReason::OwnEvent));
        return smallvec![Effect::None];
    }
    if message.channel_id != env.config.requests_channel {
        finish(state, Outcome::Ignored(IgnoreReason::OutsideRequestChannel));
        return smallvec![Effect::None];
    }

    state.status = Some(TicketStatus::Open);
    let messages = Arc::clone(&env.messages);
    let (channel, request) = (message.channel_id, message.message_id);
    smallvec![transition(async move {
        for symbol in ReactionSymbol::ALPHABET {
            messages
                .add_reaction(channel, request, symbol.emoji().to_string())
                .await
                .during("add_reaction")?;
        }
        Ok(Outcome::ReactionsAttached)
    })]
}

fn on_reaction_added(
    state: &mut RequestState,
    reaction: ReactionAdded,
    env: &RequestEnvironment,
) -> Effects {
    if reaction.user_id == env.identity {
        finish(state, Outcome::Ignored(IgnoreReason::OwnEvent));
        return smallvec![Effect::None];
    }
    if reaction.channel_id != env.config.requests_channel {
        finish(state, Outcome::Ignored(IgnoreReason::OutsideRequestChannel));
        return smallvec![Effect::None];
    }
    if ReactionSymbol::parse(&reaction.emoji).is_none() {
        finish(state, Outcome::Ignored(IgnoreReason::UnrecognizedEmoji));
        return smallvec![Effect::None];
    }

    let messages = Arc::clone(&env.messages);
    let threads = env.threads.clone();
    smallvec![Effect::future(async move {
        match load_snapshot(messages.as_ref(), &threads, &reaction).await {
            Ok(snapshot) => Some(RequestAction::SnapshotLoaded { reaction, snapshot }),
            Err(failure) => Some(RequestAction::TransitionFailed(failure)),
        }
    })]
}

async fn load_snapshot(
    messages: &dyn RequestChannel,
    threads: &ThreadLifecycle,
    reaction: &ReactionAdded,
) -> Result<Option<RequestSnapshot>, PlatformCallFailure> {
    let Some(message) = messages
        .fetch_message(reaction.channel_id, reaction.message_id)
        .await
        .during("fetch_message")?
    else {
        return Ok(None);
    };
    let threads = threads
        .threads_for_request(reaction.guild_id, reaction.message_id)
        .await?;
    Ok(Some(RequestSnapshot::new(&message, threads)))
}

fn decide(
    state: &mut RequestState,
    reaction: ReactionAdded,
    snapshot: RequestSnapshot,
    env: &RequestEnvironment,
) -> Effects {
    let status = snapshot.status();
    state.status = Some(status);
    let customer = snapshot.customer;
    let reactions = snapshot.reactions.clone();
    state.snapshot = Some(snapshot);

    let Some(symbol) = ReactionSymbol::parse(&reaction.emoji) else {
        finish(state, Outcome::Ignored(IgnoreReason::UnrecognizedEmoji));
        return smallvec![Effect::None];
    };

    let Some(customer) = customer else {
        return smallvec![strip(env, &reaction, Rejection::UnresolvedCustomer)];
    };

    if status == TicketStatus::Locked {
        finish(state, Outcome::Rejected(Rejection::GuardedTerminalState));
        return smallvec![Effect::None];
    }

    let denied = require_role(reaction.roles(), env.config.developer_role).err();

    match (symbol, denied) {
        (ReactionSymbol::Approve | ReactionSymbol::Report, Some(rejection)) => {
            smallvec![strip(env, &reaction, rejection)]
        },
        (ReactionSymbol::Approve, None) if status == TicketStatus::Claimed => {
            smallvec![strip(env, &reaction, Rejection::DuplicateResource)]
        },
        (ReactionSymbol::Approve, None) => smallvec![claim(env, reaction, customer)],

        (ReactionSymbol::ClaimLock, _) if reaction.user_id != customer => {
            smallvec![strip(env, &reaction, Rejection::AuthorizationDenied)]
        },
        (ReactionSymbol::ClaimLock, _) => smallvec![lock(env, &reaction)],

        (ReactionSymbol::Report, None) => smallvec![report(env, &reaction, reactions)],
    }
}

/// Run a transition and report its result back to the reducer.
fn transition<F>(work: F) -> Effect<RequestAction>
where
    F: Future<Output = Result<Outcome, PlatformCallFailure>> + Send + 'static,
{
    Effect::future(async move {
        Some(match work.await {
            Ok(outcome) => RequestAction::TransitionApplied(outcome),
            Err(failure) => RequestAction::TransitionFailed(failure),
        })
    })
}

/// Remove the triggering reaction and record `rejection`.
fn strip(env: &RequestEnvironment, reaction: &ReactionAdded, rejection: Rejection) -> Effect<RequestAction> {
    let messages = Arc::clone(&env.messages);
    let (channel, request, user) = (reaction.channel_id, reaction.message_id, reaction.user_id);
    let emoji = reaction.emoji.clone();
    transition(async move {
        messages
            .remove_reaction(channel, request, emoji, user)
            .await
            .during("remove_reaction")?;
        Ok(Outcome::Rejected(rejection))
    })
}

/// Strip the approval, create the thread and staff it.
///
/// If staffing fails the new thread is removed again, so the request stays
/// `Open` and the next approval can retry.
fn claim(env: &RequestEnvironment, reaction: ReactionAdded, customer: UserId) -> Effect<RequestAction> {
    let name = thread_name(&reaction.display_name(), reaction.message_id, env.clock.now());
    let messages = Arc::clone(&env.messages);
    let members = Arc::clone(&env.members);
    let threads = env.threads.clone();
    let moderator_role = env.config.moderator_role;

    transition(async move {
        messages
            .remove_reaction(
                reaction.channel_id,
                reaction.message_id,
                reaction.emoji.clone(),
                reaction.user_id,
            )
            .await
            .during("remove_reaction")?;

        let thread = threads.create_thread(reaction.channel_id, name).await?;

        let staffed = async {
            let moderators = members
                .role_members(reaction.guild_id, moderator_role)
                .await
                .during("role_members")?;
            let participants = [customer, reaction.user_id].into_iter().chain(moderators);
            threads.add_participants(thread.id, participants).await
        }
        .await;

        match staffed {
            Ok(participants) => Ok(Outcome::Claimed {
                thread,
                participants,
            }),
            Err(failure) => {
                if let Err(cleanup) = threads.delete_thread(thread.id).await {
                    tracing::warn!(thread = %thread.id, error = %cleanup, "Could not remove half-staffed thread");
                }
                Err(failure)
            },
        }
    })
}

/// Clear every reaction, delete the request's threads and add the lock marker.
fn lock(env: &RequestEnvironment, reaction: &ReactionAdded) -> Effect<RequestAction> {
    let messages = Arc::clone(&env.messages);
    let threads = env.threads.clone();
    let (guild, channel, request) = (reaction.guild_id, reaction.channel_id, reaction.message_id);

    transition(async move {
        messages
            .clear_reactions(channel, request)
            .await
            .during("clear_reactions")?;
        let threads_deleted = threads.delete_request_threads(guild, request).await?;
        messages
            .add_reaction(channel, request, LOCK_MARKER.to_string())
            .await
            .during("add_reaction")?;
        Ok(Outcome::Locked { threads_deleted })
    })
}

/// Count the developers reporting the request and delete it at the threshold.
///
/// Only reporters currently holding the developer role count. The role is
/// read live, so a stray ❌ whose own event has not been handled yet (or
/// never will be) cannot push the request over the threshold.
fn report(
    env: &RequestEnvironment,
    reaction: &ReactionAdded,
    reactions: ReactionSet,
) -> Effect<RequestAction> {
    let messages = Arc::clone(&env.messages);
    let members = Arc::clone(&env.members);
    let (guild, channel, request) = (reaction.guild_id, reaction.channel_id, reaction.message_id);
    let (actor, identity, developer_role) = (reaction.user_id, env.identity, env.config.developer_role);

    transition(async move {
        let developers = members
            .role_members(guild, developer_role)
            .await
            .during("role_members")?;
        // The actor's roles came with the event and were checked already.
        let count = reactions.distinct_reporters(|user| {
            user != identity && (user == actor || developers.contains(&user))
        });
        if count < REPORT_THRESHOLD {
            return Ok(Outcome::Rejected(Rejection::ThresholdNotMet { count }));
        }

        tolerate_missing(messages.delete_message(channel, request).await).during("delete_message")?;
        Ok(Outcome::Deleted)
    })
}

/// Record the outcome of the run, with a log line and a metric.
fn finish(state: &mut RequestState, outcome: Outcome) {
    metrics::counter!("triage_request_outcomes_total", "outcome" => outcome.label()).increment(1);

    match &outcome {
        Outcome::Ignored(reason) => {
            tracing::trace!(reason = reason.label(), "Event ignored");
        },
        Outcome::Rejected(rejection) => {
            tracing::debug!(reason = rejection.label(), %rejection, "Transition rejected");
        },
        Outcome::Failed(failure) => {
            tracing::error!(operation = failure.operation, error = %failure.source, "Transition aborted");
        },
        applied => {
            tracing::info!(
                outcome = applied.label(),
                status = state.status.map(TicketStatus::label),
                "Transition applied"
            );
        },
    }

    state.outcome = Some(outcome);
}

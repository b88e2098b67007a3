//! Unit tests for `RequestReducer`.
//!
//! Pure decisions are checked with `ReducerTest`. Transitions are followed
//! through their effects against an `InMemoryGuild`, one feedback step at a
//! time, the way the store drives them.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use super::*;
use crate::config::DeskConfig;
use crate::error::{PlatformCallFailure, Rejection};
use crate::threads::ThreadLifecycle;
use std::sync::Arc;
use triage_core::event::{MemberSnapshot, MessageCreated, ReactionAdded};
use triage_core::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use triage_core::platform::{PlatformError, ThreadInfo};
use triage_core::reducer::Reducer;
use triage_testing::reducer_test::execute_effects;
use triage_testing::{InMemoryGuild, PlatformCall, ReducerTest, assertions, test_clock};

const GUILD: GuildId = GuildId::new(1);
const BOT: UserId = UserId::new(2);
const REQUESTS: ChannelId = ChannelId::new(100);
const LOUNGE: ChannelId = ChannelId::new(101);
const DEVELOPER_ROLE: RoleId = RoleId::new(500);
const MODERATOR_ROLE: RoleId = RoleId::new(600);
const CUSTOMER: UserId = UserId::new(10);
const DEVELOPER: UserId = UserId::new(20);
const MEMBER: UserId = UserId::new(30);
const MODERATOR: UserId = UserId::new(40);
const REQUEST: MessageId = MessageId::new(4242);
const REPORTERS: [UserId; 4] = [UserId::new(50), UserId::new(51), UserId::new(52), UserId::new(53)];

fn desk() -> DeskConfig {
    DeskConfig {
        requests_channel: REQUESTS,
        create_voice_channel: ChannelId::new(200),
        voice_category: ChannelId::new(300),
        afk_channel: ChannelId::new(201),
        developer_role: DEVELOPER_ROLE,
        moderator_role: MODERATOR_ROLE,
    }
}

fn guild() -> InMemoryGuild {
    let guild = InMemoryGuild::new(GUILD, BOT);
    guild.post_message(REQUESTS, REQUEST, vec![CUSTOMER]);
    guild.set_role_members(MODERATOR_ROLE, vec![MODERATOR]);
    let mut developers = REPORTERS.to_vec();
    developers.push(DEVELOPER);
    guild.set_role_members(DEVELOPER_ROLE, developers);
    guild
}

fn env(guild: &InMemoryGuild) -> RequestEnvironment {
    let platform = Arc::new(guild.clone());
    RequestEnvironment::new(
        Arc::new(desk()),
        BOT,
        Arc::new(test_clock()),
        platform.clone(),
        ThreadLifecycle::new(platform.clone()),
        platform,
    )
}

fn reaction(emoji: &str, user: UserId, roles: &[RoleId]) -> ReactionAdded {
    ReactionAdded {
        guild_id: GUILD,
        channel_id: REQUESTS,
        message_id: REQUEST,
        user_id: user,
        member: Some(MemberSnapshot {
            display_name: format!("user{user}"),
            roles: roles.to_vec(),
        }),
        emoji: emoji.to_string(),
    }
}

fn snapshot(reactions: ReactionSet, threads: Vec<ThreadInfo>) -> RequestSnapshot {
    RequestSnapshot {
        message_id: REQUEST,
        channel_id: REQUESTS,
        customer: Some(CUSTOMER),
        reactions,
        threads,
    }
}

fn claimed_thread() -> ThreadInfo {
    ThreadInfo {
        id: ChannelId::new(777),
        name: format!("someone>{REQUEST}>2024-12-31 23:00:00.000000"),
        parent_id: Some(REQUESTS),
    }
}

/// Reduce `action` and keep executing effects until no feedback is left.
async fn drive(env: &RequestEnvironment, action: RequestAction) -> RequestState {
    let reducer = RequestReducer::new();
    let mut state = RequestState::default();
    let mut pending = vec![action];
    while let Some(action) = pending.pop() {
        let effects = reducer.reduce(&mut state, action, env);
        pending.extend(execute_effects(effects.into_vec()).await);
    }
    state
}

/// React on the guild first, as the platform does before delivering the event.
async fn react_and_drive(
    guild: &InMemoryGuild,
    emoji: &str,
    user: UserId,
    roles: &[RoleId],
) -> RequestState {
    guild.react(REQUEST, emoji, user);
    drive(&env(guild), RequestAction::ReactionAdded(reaction(emoji, user, roles))).await
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn own_reaction_is_ignored_without_effects() {
    let guild = guild();
    ReducerTest::new(RequestReducer::new())
        .with_env(env(&guild))
        .given_state(RequestState::default())
        .when_action(RequestAction::ReactionAdded(reaction("✅", BOT, &[])))
        .then_state(|state| {
            assert_eq!(state.outcome, Some(Outcome::Ignored(IgnoreReason::OwnEvent)));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn reaction_outside_requests_channel_is_ignored() {
    let guild = guild();
    let mut elsewhere = reaction("✅", DEVELOPER, &[DEVELOPER_ROLE]);
    elsewhere.channel_id = LOUNGE;

    ReducerTest::new(RequestReducer::new())
        .with_env(env(&guild))
        .given_state(RequestState::default())
        .when_action(RequestAction::ReactionAdded(elsewhere))
        .then_state(|state| {
            assert_eq!(
                state.outcome,
                Some(Outcome::Ignored(IgnoreReason::OutsideRequestChannel))
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn unrecognized_emoji_and_lock_marker_are_ignored() {
    let guild = guild();
    for emoji in ["👍", LOCK_MARKER] {
        ReducerTest::new(RequestReducer::new())
            .with_env(env(&guild))
            .given_state(RequestState::default())
            .when_action(RequestAction::ReactionAdded(reaction(emoji, CUSTOMER, &[])))
            .then_state(|state| {
                assert_eq!(
                    state.outcome,
                    Some(Outcome::Ignored(IgnoreReason::UnrecognizedEmoji))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

#[test]
fn recognized_reaction_loads_a_snapshot() {
    let guild = guild();
    ReducerTest::new(RequestReducer::new())
        .with_env(env(&guild))
        .given_state(RequestState::default())
        .when_action(RequestAction::ReactionAdded(reaction("❌", DEVELOPER, &[DEVELOPER_ROLE])))
        .then_state(|state| assert_eq!(state.outcome, None))
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn missing_message_is_treated_as_deleted() {
    let guild = guild();
    ReducerTest::new(RequestReducer::new())
        .with_env(env(&guild))
        .given_state(RequestState::default())
        .when_action(RequestAction::SnapshotLoaded {
            reaction: reaction("✅", DEVELOPER, &[DEVELOPER_ROLE]),
            snapshot: None,
        })
        .then_state(|state| {
            assert_eq!(state.status, Some(TicketStatus::Deleted));
            assert_eq!(state.outcome, Some(Outcome::Ignored(IgnoreReason::MessageGone)));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn locked_request_rejects_everything_untouched() {
    let guild = guild();
    for (emoji, user, roles) in [
        ("✅", DEVELOPER, vec![DEVELOPER_ROLE]),
        ("🔐", CUSTOMER, vec![]),
        ("❌", DEVELOPER, vec![DEVELOPER_ROLE]),
    ] {
        ReducerTest::new(RequestReducer::new())
            .with_env(env(&guild))
            .given_state(RequestState::default())
            .when_action(RequestAction::SnapshotLoaded {
                reaction: reaction(emoji, user, &roles),
                snapshot: Some(snapshot(ReactionSet::default().with_lock(), vec![])),
            })
            .then_state(|state| {
                assert_eq!(state.status, Some(TicketStatus::Locked));
                assert_eq!(
                    state.outcome,
                    Some(Outcome::Rejected(Rejection::GuardedTerminalState))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

#[test]
fn developer_report_reads_the_role_before_counting() {
    let guild = guild();
    let reactions = REPORTERS
        .into_iter()
        .fold(ReactionSet::default(), |set, user| set.with(ReactionSymbol::Report, user));

    ReducerTest::new(RequestReducer::new())
        .with_env(env(&guild))
        .given_state(RequestState::default())
        .when_action(RequestAction::SnapshotLoaded {
            reaction: reaction("❌", DEVELOPER, &[DEVELOPER_ROLE]),
            snapshot: Some(snapshot(reactions.with(ReactionSymbol::Report, BOT), vec![])),
        })
        .then_state(|state| assert_eq!(state.outcome, None))
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[tokio::test]
async fn request_without_mention_strips_the_reaction() {
    let guild = InMemoryGuild::new(GUILD, BOT);
    guild.post_message(REQUESTS, REQUEST, vec![]);

    let state = react_and_drive(&guild, "✅", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::UnresolvedCustomer))
    );
    assert_eq!(state.status, Some(TicketStatus::Open));
    assert!(guild.reactors(REQUEST, "✅").is_empty());
    assert!(guild.threads().is_empty());
}

// ============================================================================
// Approve
// ============================================================================

#[tokio::test]
async fn developer_approval_claims_the_request() {
    let guild = guild();

    let state = react_and_drive(&guild, "✅", DEVELOPER, &[DEVELOPER_ROLE]).await;

    let threads = guild.threads();
    assert_eq!(threads.len(), 1);
    assert_eq!(
        threads[0].name,
        format!("user{DEVELOPER}>{REQUEST}>2025-01-01 00:00:00.000000")
    );
    assert_eq!(threads[0].parent_id, Some(REQUESTS));
    assert_eq!(
        guild.thread_members(threads[0].id),
        vec![CUSTOMER, DEVELOPER, MODERATOR]
    );
    assert!(!guild.reactors(REQUEST, "✅").contains(&DEVELOPER));

    assert_eq!(state.status, Some(TicketStatus::Claimed));
    assert_eq!(
        state.outcome,
        Some(Outcome::Claimed {
            thread: threads[0].clone(),
            participants: 3,
        })
    );
}

#[tokio::test]
async fn approval_without_developer_role_is_stripped() {
    let guild = guild();

    let state = react_and_drive(&guild, "✅", MEMBER, &[]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::AuthorizationDenied))
    );
    assert!(guild.reactors(REQUEST, "✅").is_empty());
    assert!(guild.threads().is_empty());
}

#[tokio::test]
async fn second_approval_is_a_duplicate() {
    let guild = guild();
    let existing = guild.add_thread(&claimed_thread().name, REQUESTS);

    let state = react_and_drive(&guild, "✅", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(state.status, Some(TicketStatus::Claimed));
    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::DuplicateResource))
    );
    assert_eq!(guild.threads(), vec![existing]);
    assert!(guild.reactors(REQUEST, "✅").is_empty());
}

#[tokio::test]
async fn failed_staffing_removes_the_new_thread() {
    let guild = guild();
    guild.fail_on("role_members", PlatformError::Forbidden);

    let state = react_and_drive(&guild, "✅", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Failed(PlatformCallFailure {
            operation: "role_members",
            source: PlatformError::Forbidden,
        }))
    );
    assert!(guild.threads().is_empty());
    assert!(guild
        .calls()
        .iter()
        .any(|call| matches!(call, PlatformCall::DeleteThread(_))));
}

#[tokio::test]
async fn failed_thread_creation_aborts_the_claim() {
    let guild = guild();
    guild.fail_on("create_thread", PlatformError::RateLimited);

    let state = react_and_drive(&guild, "✅", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert!(matches!(
        state.outcome,
        Some(Outcome::Failed(PlatformCallFailure {
            operation: "create_thread",
            ..
        }))
    ));
    assert_eq!(state.status, Some(TicketStatus::Open));
    assert!(!guild
        .calls()
        .iter()
        .any(|call| matches!(call, PlatformCall::RoleMembers(_))));
}

// ============================================================================
// Claim-lock
// ============================================================================

#[tokio::test]
async fn customer_lock_clears_reactions_and_threads() {
    let guild = guild();
    guild.react(REQUEST, "✅", BOT);
    guild.react(REQUEST, "❌", BOT);
    guild.react(REQUEST, "❌", DEVELOPER);
    guild.add_thread(&claimed_thread().name, REQUESTS);
    let unrelated = guild.add_thread("someone>999>2025-01-01 00:00:00.000000", REQUESTS);

    let state = react_and_drive(&guild, "🔐", CUSTOMER, &[]).await;

    assert_eq!(state.status, Some(TicketStatus::Locked));
    assert_eq!(state.outcome, Some(Outcome::Locked { threads_deleted: 1 }));
    assert_eq!(guild.threads(), vec![unrelated]);

    let message = guild.message(REQUEST).unwrap();
    assert_eq!(message.reactions.len(), 1);
    assert_eq!(message.reactions[0].emoji, LOCK_MARKER);
    assert_eq!(message.reactions[0].users, vec![BOT]);
}

#[tokio::test]
async fn lock_applies_to_open_requests_too() {
    let guild = guild();

    let state = react_and_drive(&guild, "🔐", CUSTOMER, &[]).await;

    assert_eq!(state.outcome, Some(Outcome::Locked { threads_deleted: 0 }));
    assert_eq!(guild.reactors(REQUEST, LOCK_MARKER), vec![BOT]);
}

#[tokio::test]
async fn lock_by_someone_else_is_stripped() {
    let guild = guild();
    guild.add_thread(&claimed_thread().name, REQUESTS);

    let state = react_and_drive(&guild, "🔐", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::AuthorizationDenied))
    );
    assert!(guild.reactors(REQUEST, "🔐").is_empty());
    assert!(guild.reactors(REQUEST, LOCK_MARKER).is_empty());
    assert_eq!(guild.threads().len(), 1);
}

// ============================================================================
// Report
// ============================================================================

#[tokio::test]
async fn fifth_distinct_reporter_deletes_the_request() {
    let guild = guild();
    guild.react(REQUEST, "❌", BOT);
    for reporter in REPORTERS {
        guild.react(REQUEST, "❌", reporter);
    }

    let state = react_and_drive(&guild, "❌", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(state.status, Some(TicketStatus::Deleted));
    assert_eq!(state.outcome, Some(Outcome::Deleted));
    assert!(guild.message(REQUEST).is_none());
}

#[tokio::test]
async fn reports_below_threshold_leave_the_request_alone() {
    let guild = guild();
    guild.react(REQUEST, "❌", BOT);
    for reporter in &REPORTERS[..3] {
        guild.react(REQUEST, "❌", *reporter);
    }

    let state = react_and_drive(&guild, "❌", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::ThresholdNotMet { count: 4 }))
    );
    assert_eq!(state.status, Some(TicketStatus::Open));
    assert!(guild.message(REQUEST).is_some());
    assert!(guild.calls().contains(&PlatformCall::RoleMembers(DEVELOPER_ROLE)));
}

#[tokio::test]
async fn reactors_outside_the_developer_role_are_not_counted() {
    let guild = guild();
    guild.react(REQUEST, "❌", BOT);
    for reporter in &REPORTERS[..3] {
        guild.react(REQUEST, "❌", *reporter);
    }
    guild.react(REQUEST, "❌", MEMBER);

    let state = react_and_drive(&guild, "❌", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::ThresholdNotMet { count: 4 }))
    );
    assert!(guild.message(REQUEST).is_some());
}

#[tokio::test]
async fn role_lookup_failure_keeps_the_request() {
    let guild = guild();
    for reporter in REPORTERS {
        guild.react(REQUEST, "❌", reporter);
    }
    guild.fail_on("role_members", PlatformError::Timeout);

    let state = react_and_drive(&guild, "❌", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Failed(PlatformCallFailure {
            operation: "role_members",
            source: PlatformError::Timeout,
        }))
    );
    assert!(guild.message(REQUEST).is_some());
}

#[tokio::test]
async fn report_without_developer_role_is_stripped() {
    let guild = guild();

    let state = react_and_drive(&guild, "❌", MEMBER, &[]).await;

    assert_eq!(
        state.outcome,
        Some(Outcome::Rejected(Rejection::AuthorizationDenied))
    );
    assert!(guild.reactors(REQUEST, "❌").is_empty());
    assert!(guild.message(REQUEST).is_some());
}

#[tokio::test]
async fn fetch_failure_aborts_before_deciding() {
    let guild = guild();
    guild.fail_on("fetch_message", PlatformError::Timeout);

    let state = react_and_drive(&guild, "❌", DEVELOPER, &[DEVELOPER_ROLE]).await;

    assert_eq!(state.snapshot, None);
    assert_eq!(
        state.outcome,
        Some(Outcome::Failed(PlatformCallFailure {
            operation: "fetch_message",
            source: PlatformError::Timeout,
        }))
    );
}

// ============================================================================
// New requests
// ============================================================================

#[tokio::test]
async fn new_request_gets_the_alphabet_in_order() {
    let guild = InMemoryGuild::new(GUILD, BOT);
    guild.post_message(REQUESTS, REQUEST, vec![CUSTOMER]);
    let posted = MessageCreated {
        guild_id: GUILD,
        channel_id: REQUESTS,
        message_id: REQUEST,
        author_id: CUSTOMER,
    };

    let state = drive(&env(&guild), RequestAction::RequestPosted(posted)).await;

    assert_eq!(state.outcome, Some(Outcome::ReactionsAttached));
    let added: Vec<_> = guild
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            PlatformCall::AddReaction { emoji, .. } => Some(emoji),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["✅", "🔐", "❌"]);
}

#[test]
fn own_and_foreign_messages_get_no_reactions() {
    let guild = guild();
    let own = MessageCreated {
        guild_id: GUILD,
        channel_id: REQUESTS,
        message_id: REQUEST,
        author_id: BOT,
    };
    let foreign = MessageCreated {
        channel_id: LOUNGE,
        author_id: CUSTOMER,
        ..own.clone()
    };

    for (message, reason) in [
        (own, IgnoreReason::OwnEvent),
        (foreign, IgnoreReason::OutsideRequestChannel),
    ] {
        ReducerTest::new(RequestReducer::new())
            .with_env(env(&guild))
            .given_state(RequestState::default())
            .when_action(RequestAction::RequestPosted(message))
            .then_state(move |state| {
                assert_eq!(state.outcome, Some(Outcome::Ignored(reason)));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}

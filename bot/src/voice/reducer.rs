//! Reducer for dynamic voice rooms.

use crate::error::{During, PlatformCallFailure, Rejection};
use crate::voice::{
    VoiceAction, VoiceEnvironment, VoiceIgnoreReason, VoiceOutcome, VoiceState, room_name,
};
use smallvec::{SmallVec, smallvec};
use std::future::Future;
use std::sync::Arc;
use triage_core::event::{MemberIdentity, VoiceChannelRef};
use triage_core::ids::GuildId;
use triage_core::platform::{PlatformError, tolerate_missing};
use triage_core::{effect::Effect, reducer::Reducer};

type Effects = SmallVec<[Effect<VoiceAction>; 4]>;

/// Reducer for personal voice rooms.
///
/// Joining the trigger channel lists the trigger's category, then creates
/// `{name}#{discriminator}` there unless a channel with that name already
/// exists, and moves the member in. Leaving a room in the managed category
/// reads its live occupancy and deletes it when empty. The trigger and AFK
/// channels are never deleted.
pub struct VoiceReducer;

impl VoiceReducer {
    /// Create a new voice reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for VoiceReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for VoiceReducer {
    type State = VoiceState;
    type Action = VoiceAction;
    type Environment = VoiceEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            VoiceAction::MemberJoinedTrigger {
                guild_id,
                member,
                trigger,
            } => {
                state.room_name = Some(room_name(&member));
                if trigger.id != env.config.create_voice_channel {
                    finish(state, VoiceOutcome::Ignored(VoiceIgnoreReason::NotTrigger));
                    return smallvec![Effect::None];
                }
                smallvec![load_category(env, guild_id, member, trigger)]
            },

            VoiceAction::CategoryLoaded {
                guild_id,
                member,
                trigger,
                channels,
            } => {
                let name = room_name(&member);
                state.room_name = Some(name.clone());
                if channels.iter().any(|channel| channel.name == name) {
                    finish(state, VoiceOutcome::Rejected(Rejection::DuplicateResource));
                    return smallvec![Effect::None];
                }
                smallvec![provision(env, guild_id, &member, &trigger, name)]
            },

            VoiceAction::MemberLeftRoom { guild_id, room, .. } => {
                state.room_name = Some(room.name.clone());
                if env.config.is_protected(room.id) {
                    finish(state, VoiceOutcome::Ignored(VoiceIgnoreReason::ProtectedChannel));
                    return smallvec![Effect::None];
                }
                if room.category_id != Some(env.config.voice_category) {
                    finish(
                        state,
                        VoiceOutcome::Ignored(VoiceIgnoreReason::OutsideManagedCategory),
                    );
                    return smallvec![Effect::None];
                }
                smallvec![load_occupancy(env, guild_id, room)]
            },

            VoiceAction::OccupancyLoaded {
                occupancy: None, ..
            } => {
                finish(state, VoiceOutcome::Ignored(VoiceIgnoreReason::RoomGone));
                smallvec![Effect::None]
            },

            VoiceAction::OccupancyLoaded {
                room,
                occupancy: Some(0),
                ..
            } => {
                state.occupancy = Some(0);
                smallvec![delete_room(env, &room)]
            },

            VoiceAction::OccupancyLoaded {
                occupancy: Some(occupancy),
                ..
            } => {
                state.occupancy = Some(occupancy);
                finish(state, VoiceOutcome::RoomKept { occupancy });
                smallvec![Effect::None]
            },

            VoiceAction::TransitionApplied(outcome) => {
                finish(state, outcome);
                smallvec![Effect::None]
            },

            VoiceAction::TransitionFailed(failure) => {
                finish(state, VoiceOutcome::Failed(failure));
                smallvec![Effect::None]
            },
        }
    }
}

fn transition<F>(work: F) -> Effect<VoiceAction>
where
    F: Future<Output = Result<VoiceOutcome, PlatformCallFailure>> + Send + 'static,
{
    Effect::future(async move {
        Some(match work.await {
            Ok(outcome) => VoiceAction::TransitionApplied(outcome),
            Err(failure) => VoiceAction::TransitionFailed(failure),
        })
    })
}

fn load_category(
    env: &VoiceEnvironment,
    guild_id: GuildId,
    member: MemberIdentity,
    trigger: VoiceChannelRef,
) -> Effect<VoiceAction> {
    let voice = Arc::clone(&env.voice);
    Effect::future(async move {
        match voice
            .category_channels(guild_id, trigger.category_id)
            .await
            .during("category_channels")
        {
            Ok(channels) => Some(VoiceAction::CategoryLoaded {
                guild_id,
                member,
                trigger,
                channels,
            }),
            Err(failure) => Some(VoiceAction::TransitionFailed(failure)),
        }
    })
}

/// Create the room next to the trigger and move the member into it.
///
/// A room whose member could not be moved in is deleted again.
fn provision(
    env: &VoiceEnvironment,
    guild_id: GuildId,
    member: &MemberIdentity,
    trigger: &VoiceChannelRef,
    name: String,
) -> Effect<VoiceAction> {
    let voice = Arc::clone(&env.voice);
    let (user, category) = (member.user_id, trigger.category_id);

    transition(async move {
        let room = voice
            .create_voice_channel(guild_id, category, name)
            .await
            .during("create_voice_channel")?;

        if let Err(failure) = voice.move_member(guild_id, user, room.id).await.during("move_member") {
            if let Err(cleanup) = tolerate_missing(voice.delete_channel(room.id).await) {
                tracing::warn!(room = %room.id, error = %cleanup, "Could not remove unused room");
            }
            return Err(failure);
        }

        Ok(VoiceOutcome::RoomCreated { room })
    })
}

fn load_occupancy(
    env: &VoiceEnvironment,
    guild_id: GuildId,
    room: VoiceChannelRef,
) -> Effect<VoiceAction> {
    let voice = Arc::clone(&env.voice);
    Effect::future(async move {
        match voice.channel_occupancy(guild_id, room.id).await {
            Ok(occupancy) => Some(VoiceAction::OccupancyLoaded {
                guild_id,
                room,
                occupancy: Some(occupancy),
            }),
            Err(PlatformError::NotFound) => Some(VoiceAction::OccupancyLoaded {
                guild_id,
                room,
                occupancy: None,
            }),
            Err(source) => Some(VoiceAction::TransitionFailed(PlatformCallFailure {
                operation: "channel_occupancy",
                source,
            })),
        }
    })
}

fn delete_room(env: &VoiceEnvironment, room: &VoiceChannelRef) -> Effect<VoiceAction> {
    let voice = Arc::clone(&env.voice);
    let room = room.id;

    transition(async move {
        if tolerate_missing(voice.delete_channel(room).await).during("delete_channel")? {
            Ok(VoiceOutcome::RoomDeleted { room })
        } else {
            Ok(VoiceOutcome::Ignored(VoiceIgnoreReason::RoomGone))
        }
    })
}

fn finish(state: &mut VoiceState, outcome: VoiceOutcome) {
    metrics::counter!("triage_voice_outcomes_total", "outcome" => outcome.label()).increment(1);

    let room = state.room_name.as_deref().unwrap_or_default();
    match &outcome {
        VoiceOutcome::Ignored(reason) => {
            tracing::trace!(room, reason = reason.label(), "Voice event ignored");
        },
        VoiceOutcome::Rejected(rejection) => {
            tracing::debug!(room, reason = rejection.label(), "Room already exists");
        },
        VoiceOutcome::Failed(failure) => {
            tracing::error!(room, operation = failure.operation, error = %failure.source, "Voice transition aborted");
        },
        VoiceOutcome::RoomKept { occupancy } => {
            tracing::debug!(room, occupancy, "Room still in use");
        },
        applied => {
            tracing::info!(room, outcome = applied.label(), "Voice transition applied");
        },
    }

    state.outcome = Some(outcome);
}

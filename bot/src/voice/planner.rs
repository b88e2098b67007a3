//! Splits voice-state changes into keyed reducer runs.

use crate::config::DeskConfig;
use crate::voice::{VoiceAction, room_name};
use std::sync::Arc;
use triage_core::event::VoiceStateChanged;

/// One reducer run and the room key it is serialized on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRun {
    /// Room name the run locks
    pub key: String,
    /// First action of the run
    pub action: VoiceAction,
}

/// Turns raw voice-state changes into runs of the `VoiceReducer`.
#[derive(Debug, Clone)]
pub struct VoiceProvisioner {
    config: Arc<DeskConfig>,
}

impl VoiceProvisioner {
    /// Create a planner for the configured trigger channel.
    #[must_use]
    pub fn new(config: Arc<DeskConfig>) -> Self {
        Self { config }
    }

    /// Runs to execute for `event`, in order.
    ///
    /// A channel change yields a leave run for the channel left (keyed by its
    /// name) followed by a join run when the new channel is the trigger
    /// (keyed by the member's room name). Mute and deafen updates keep the
    /// channel and yield nothing.
    #[must_use]
    pub fn plan(&self, event: &VoiceStateChanged) -> Vec<PlannedRun> {
        if !event.changed_channel() {
            return Vec::new();
        }

        let mut runs = Vec::with_capacity(2);
        if let Some(left) = &event.before {
            runs.push(PlannedRun {
                key: left.name.clone(),
                action: VoiceAction::MemberLeftRoom {
                    guild_id: event.guild_id,
                    member: event.member.clone(),
                    room: left.clone(),
                },
            });
        }
        if let Some(joined) = event
            .after
            .as_ref()
            .filter(|channel| channel.id == self.config.create_voice_channel)
        {
            runs.push(PlannedRun {
                key: room_name(&event.member),
                action: VoiceAction::MemberJoinedTrigger {
                    guild_id: event.guild_id,
                    member: event.member.clone(),
                    trigger: joined.clone(),
                },
            });
        }
        runs
    }
}

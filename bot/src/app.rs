//! Application facade.
//!
//! `TriageApp` owns one store per engine and routes typed platform events to
//! them. Request runs are keyed by message id, voice runs by room name, so
//! events for one request or one room are serialized while everything else
//! runs in parallel.

use crate::config::DeskConfig;
use crate::requests::{RequestAction, RequestEnvironment, RequestReducer, RequestState};
use crate::threads::ThreadLifecycle;
use crate::voice::{VoiceAction, VoiceEnvironment, VoiceProvisioner, VoiceReducer, VoiceState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use triage_core::environment::Clock;
use triage_core::event::{MessageCreated, ReactionAdded, VoiceStateChanged};
use triage_core::ids::{MessageId, UserId};
use triage_core::platform::{MemberDirectory, RequestChannel, ThreadDirectory, VoiceDirectory};
use triage_runtime::Store;
use triage_runtime::error::StoreError;

/// Store running the request workflow, keyed by request message.
pub type RequestStore =
    Store<MessageId, RequestState, RequestAction, RequestEnvironment, RequestReducer>;

/// Store running the voice provisioner, keyed by room name.
pub type VoiceStore = Store<String, VoiceState, VoiceAction, VoiceEnvironment, VoiceReducer>;

/// The platform ports both engines use.
#[derive(Clone)]
pub struct PlatformPorts {
    /// Request messages and reactions
    pub messages: Arc<dyn RequestChannel>,
    /// Threads
    pub threads: Arc<dyn ThreadDirectory>,
    /// Role membership
    pub members: Arc<dyn MemberDirectory>,
    /// Voice channels
    pub voice: Arc<dyn VoiceDirectory>,
}

impl PlatformPorts {
    /// Use one platform implementation for every port.
    #[must_use]
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: RequestChannel + ThreadDirectory + MemberDirectory + VoiceDirectory + 'static,
    {
        Self {
            messages: platform.clone(),
            threads: platform.clone(),
            members: platform.clone(),
            voice: platform,
        }
    }
}

/// Both engines behind one event-routing facade.
#[derive(Clone)]
pub struct TriageApp {
    requests: RequestStore,
    voice: VoiceStore,
    provisioner: VoiceProvisioner,
}

impl TriageApp {
    /// Build both engines around `config`.
    ///
    /// `identity` is the bot's own user id; its reactions and messages are
    /// ignored and its seed ❌ does not count as a report.
    #[must_use]
    pub fn new(
        config: DeskConfig,
        identity: UserId,
        clock: Arc<dyn Clock>,
        ports: PlatformPorts,
    ) -> Self {
        let config = Arc::new(config);

        let request_env = RequestEnvironment::new(
            Arc::clone(&config),
            identity,
            clock,
            ports.messages,
            ThreadLifecycle::new(ports.threads),
            ports.members,
        );
        let voice_env = VoiceEnvironment::new(Arc::clone(&config), ports.voice);

        Self {
            requests: Store::new("requests", RequestReducer::new(), request_env),
            voice: Store::new("voice", VoiceReducer::new(), voice_env),
            provisioner: VoiceProvisioner::new(config),
        }
    }

    /// Attach the reaction alphabet to a new request.
    pub fn on_message(&self, message: MessageCreated) -> JoinHandle<Result<RequestState, StoreError>> {
        self.requests
            .dispatch(message.message_id, RequestAction::RequestPosted(message))
    }

    /// Process a reaction on a request.
    pub fn on_reaction_added(
        &self,
        reaction: ReactionAdded,
    ) -> JoinHandle<Result<RequestState, StoreError>> {
        self.requests
            .dispatch(reaction.message_id, RequestAction::ReactionAdded(reaction))
    }

    /// Provision or clean up rooms for a voice-state change.
    ///
    /// The planned runs execute in order on one task; each holds only its
    /// own room key.
    pub fn on_voice_state_changed(
        &self,
        event: VoiceStateChanged,
    ) -> JoinHandle<Result<Vec<VoiceState>, StoreError>> {
        let runs = self.provisioner.plan(&event);
        let store = self.voice.clone();

        tokio::spawn(async move {
            let mut states = Vec::with_capacity(runs.len());
            for run in runs {
                states.push(store.send(run.key, run.action).await?);
            }
            Ok(states)
        })
    }

    /// Stop accepting events and wait up to `timeout` for in-flight runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if runs are still going when
    /// the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!(
            requests = self.requests.in_flight(),
            voice = self.voice.in_flight(),
            "Shutting down engines"
        );
        tokio::try_join!(self.requests.shutdown(timeout), self.voice.shutdown(timeout))?;
        Ok(())
    }

    /// The request workflow store.
    #[must_use]
    pub const fn requests(&self) -> &RequestStore {
        &self.requests
    }

    /// The voice provisioner store.
    #[must_use]
    pub const fn voice(&self) -> &VoiceStore {
        &self.voice
    }
}

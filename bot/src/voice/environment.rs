//! Environment for the voice room reducer.

use crate::config::DeskConfig;
use std::sync::Arc;
use triage_core::platform::VoiceDirectory;

/// Dependencies of the voice provisioner.
#[derive(Clone)]
pub struct VoiceEnvironment {
    /// Channel identifiers
    pub config: Arc<DeskConfig>,
    /// Voice channels and their occupants
    pub voice: Arc<dyn VoiceDirectory>,
}

impl VoiceEnvironment {
    /// Create a new environment.
    #[must_use]
    pub fn new(config: Arc<DeskConfig>, voice: Arc<dyn VoiceDirectory>) -> Self {
        Self { config, voice }
    }
}

//! Dynamic Voice Channel Provisioner.
//!
//! Joining the trigger channel provisions a personal room named after the
//! member; leaving a room in the managed category deletes it once empty.
//! Like the request workflow, nothing is remembered between events: room
//! existence and occupancy are read live on every run.

pub mod actions;
pub mod environment;
pub mod planner;
pub mod reducer;
pub mod types;

pub use actions::VoiceAction;
pub use environment::VoiceEnvironment;
pub use planner::{PlannedRun, VoiceProvisioner};
pub use reducer::VoiceReducer;
pub use types::{VoiceIgnoreReason, VoiceOutcome, VoiceState, room_name};

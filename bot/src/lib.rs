//! # Triage Bot
//!
//! Two event-driven lifecycle managers for a community chat server:
//!
//! - **Request tickets** ([`requests`]): messages posted in the requests channel
//!   get the reaction alphabet ✅ 🔐 ❌. Developers approve (a staffed thread
//!   is created) or report (five reports delete the request); the customer
//!   locks the request, which clears it and removes its thread.
//! - **Voice rooms** ([`voice`]): joining the trigger channel creates a
//!   personal room and moves the member into it; dynamic rooms are deleted
//!   once empty.
//!
//! Neither engine stores anything between events. Each inbound event starts a
//! fresh reducer run that reads the live platform state, decides, and applies
//! its platform calls. Runs for the same request or room are serialized by the
//! [`triage_runtime::Store`].
//!
//! The live connector and the binary are behind the `discord` feature; the
//! engines only depend on the ports in [`triage_core::platform`].

pub mod app;
pub mod authorization;
pub mod config;
pub mod error;
pub mod requests;
pub mod telemetry;
pub mod threads;
pub mod voice;

#[cfg(feature = "discord")]
pub mod discord;

pub use app::{PlatformPorts, TriageApp};
pub use config::{Config, ConfigError, DeskConfig};
pub use error::{PlatformCallFailure, Rejection};

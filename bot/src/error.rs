//! Error taxonomy of the engines.
//!
//! Nothing here is ever shown in the chat. Rejections end a run silently
//! (apart from stripping the triggering reaction); platform failures abort the
//! current transition and are logged for operators.

use crate::requests::REPORT_THRESHOLD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::platform::{PlatformError, PlatformResult};

/// Why an engine declined to apply a transition.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// The actor lacks the required role or is not the customer
    #[error("actor is not authorized for this action")]
    AuthorizationDenied,

    /// The request mentions nobody, so it has no customer
    #[error("request has no mentioned customer")]
    UnresolvedCustomer,

    /// The request is locked and accepts no further reactions
    #[error("request is locked")]
    GuardedTerminalState,

    /// The thread or voice room already exists
    #[error("resource already exists")]
    DuplicateResource,

    /// Not enough reports to delete the request yet
    #[error("{count} of {} reports", REPORT_THRESHOLD)]
    ThresholdNotMet {
        /// Distinct reporters counted
        count: usize,
    },
}

impl Rejection {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AuthorizationDenied => "authorization_denied",
            Self::UnresolvedCustomer => "unresolved_customer",
            Self::GuardedTerminalState => "guarded_terminal_state",
            Self::DuplicateResource => "duplicate_resource",
            Self::ThresholdNotMet { .. } => "threshold_not_met",
        }
    }
}

/// A platform call failed; the transition it belonged to was aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("platform call {operation} failed: {source}")]
pub struct PlatformCallFailure {
    /// Port method that failed
    pub operation: &'static str,
    /// Error returned by the platform
    #[source]
    pub source: PlatformError,
}

/// Attach the failing operation to a platform result.
pub trait During<T> {
    /// Wrap an error as a [`PlatformCallFailure`] for `operation`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped failure when `self` is an error.
    fn during(self, operation: &'static str) -> Result<T, PlatformCallFailure>;
}

impl<T> During<T> for PlatformResult<T> {
    fn during(self, operation: &'static str) -> Result<T, PlatformCallFailure> {
        self.map_err(|source| PlatformCallFailure { operation, source })
    }
}

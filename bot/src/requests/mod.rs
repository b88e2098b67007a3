//! Request Ticket Workflow Engine.
//!
//! Messages posted in the requests channel are tickets. Their lifecycle is
//! driven entirely by reactions:
//!
//! ```text
//!            ✅ by developer              🔐 by customer
//!   Open ─────────────────────▶ Claimed ──────────────────▶ Locked
//!    │                            │
//!    └──── ❌ × 5 by developers ───┴──────────────────────▶ Deleted
//! ```
//!
//! The state is never stored. Each reaction event reads the message's
//! reactions and the threads referencing it, derives a [`TicketStatus`], and
//! decides from there.

pub mod actions;
pub mod environment;
pub mod reducer;
#[cfg(test)]
mod tests;
pub mod types;

pub use actions::RequestAction;
pub use environment::RequestEnvironment;
pub use reducer::RequestReducer;
pub use types::{
    IgnoreReason, LOCK_MARKER, Outcome, REPORT_THRESHOLD, ReactionSet, ReactionSymbol,
    RequestSnapshot, RequestState, TicketStatus,
};

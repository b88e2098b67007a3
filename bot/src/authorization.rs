//! Role checks.
//!
//! Roles come from the member data delivered with each event and are never
//! cached between events.

use crate::error::Rejection;
use triage_core::ids::RoleId;

/// `true` when `roles` contains `required`.
#[must_use]
pub fn has_role(roles: &[RoleId], required: RoleId) -> bool {
    roles.contains(&required)
}

/// Require `required` among `roles`.
///
/// # Errors
///
/// Returns [`Rejection::AuthorizationDenied`] when the role is missing.
pub fn require_role(roles: &[RoleId], required: RoleId) -> Result<(), Rejection> {
    if has_role(roles, required) {
        Ok(())
    } else {
        Err(Rejection::AuthorizationDenied)
    }
}

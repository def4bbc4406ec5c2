use super::model::{Actor, Role};
use crate::error::CoreError;

/// Reject the request before any mutation unless the actor holds `role`.
pub fn require_role(actor: &Actor, role: Role) -> Result<(), CoreError> {
    if actor.user_role == role {
        Ok(())
    } else {
        tracing::warn!(
            "Access denied: user_id={} role={:?} required={:?}",
            actor.user_id,
            actor.user_role,
            role
        );
        Err(CoreError::Forbidden("Access denied".to_string()))
    }
}

pub fn require_admin(actor: &Actor) -> Result<(), CoreError> {
    require_role(actor, Role::Admin)
}

/// Admins see everything, patients only their own records.
pub fn can_view(actor: &Actor, owner_id: &str) -> bool {
    actor.user_role == Role::Admin || actor.user_id == owner_id
}

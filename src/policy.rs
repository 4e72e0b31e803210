//! Authorization rules shared by every handler.
//!
//! Each rule exists as a plain predicate (used for the `can_edit`/`can_delete`
//! flags) and as an `ensure_*` check returning `Denied`, which handlers turn
//! into a 403 with `?`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{User, UserRole},
};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{0}")]
pub struct Denied(pub &'static str);

impl From<Denied> for AppError {
    fn from(denied: Denied) -> Self {
        AppError::Forbidden(denied.0.to_string())
    }
}

fn is_staff(role: UserRole) -> bool {
    matches!(role, UserRole::Moderator | UserRole::Admin)
}

// --- Routes (and the waypoints they own) ---

/// Owner, moderator or admin. Covers update, publish, draft and waypoint edits.
pub fn can_edit_route(actor: &AuthUser, creator_id: Uuid) -> bool {
    actor.id == creator_id || is_staff(actor.role)
}

/// Owner or admin. Moderators can edit but not delete.
pub fn can_delete_route(actor: &AuthUser, creator_id: Uuid) -> bool {
    actor.id == creator_id || actor.is_admin()
}

pub fn ensure_can_edit_route(actor: &AuthUser, creator_id: Uuid) -> Result<(), Denied> {
    if can_edit_route(actor, creator_id) {
        Ok(())
    } else {
        Err(Denied("You are not allowed to edit this route"))
    }
}

pub fn ensure_can_delete_route(actor: &AuthUser, creator_id: Uuid) -> Result<(), Denied> {
    if can_delete_route(actor, creator_id) {
        Ok(())
    } else {
        Err(Denied("You are not allowed to delete this route"))
    }
}

// --- Comments ---

/// The author always; an admin unless the author is another admin; a moderator
/// only for comments written by plain users.
pub fn can_delete_comment(actor: &AuthUser, author_id: Uuid, author_role: UserRole) -> bool {
    if actor.id == author_id {
        return true;
    }
    match actor.role {
        UserRole::Admin => author_role != UserRole::Admin,
        UserRole::Moderator => author_role == UserRole::User,
        UserRole::User => false,
    }
}

pub fn ensure_can_delete_comment(
    actor: &AuthUser,
    author_id: Uuid,
    author_role: UserRole,
) -> Result<(), Denied> {
    if can_delete_comment(actor, author_id, author_role) {
        Ok(())
    } else {
        Err(Denied("You are not allowed to delete this comment"))
    }
}

// --- Account administration ---

pub fn ensure_admin(actor: &AuthUser) -> Result<(), Denied> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Denied("Administrator privileges required"))
    }
}

/// The admin actions that target another account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    Delete,
    ResetPassword,
    ToggleBlock,
    ChangeRole,
}

/// Admins never act on their own account through `/admin`. Deleting an admin or
/// resetting an admin's password is refused; blocking and role changes are not.
pub fn ensure_can_manage_account(
    actor: &AuthUser,
    target: &User,
    action: AccountAction,
) -> Result<(), Denied> {
    ensure_admin(actor)?;

    if actor.id == target.id {
        return Err(match action {
            AccountAction::Delete => Denied("Administrators cannot delete their own account"),
            AccountAction::ResetPassword => {
                Denied("Use the profile password change for your own account")
            }
            AccountAction::ToggleBlock => Denied("Administrators cannot block themselves"),
            AccountAction::ChangeRole => Denied("Administrators cannot change their own role"),
        });
    }

    if target.role == UserRole::Admin {
        match action {
            AccountAction::Delete => return Err(Denied("Administrator accounts cannot be deleted")),
            AccountAction::ResetPassword => {
                return Err(Denied("Administrator passwords cannot be reset"));
            }
            AccountAction::ToggleBlock | AccountAction::ChangeRole => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: UserRole) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn account(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            role,
            ..User::default()
        }
    }

    #[test]
    fn route_edit_matrix() {
        let owner = actor(UserRole::User);
        let stranger = actor(UserRole::User);
        let moderator = actor(UserRole::Moderator);
        let admin = actor(UserRole::Admin);

        assert!(can_edit_route(&owner, owner.id));
        assert!(!can_edit_route(&stranger, owner.id));
        assert!(can_edit_route(&moderator, owner.id));
        assert!(can_edit_route(&admin, owner.id));
    }

    #[test]
    fn moderators_cannot_delete_routes() {
        let owner = actor(UserRole::User);
        let moderator = actor(UserRole::Moderator);
        let admin = actor(UserRole::Admin);

        assert!(can_delete_route(&owner, owner.id));
        assert!(!can_delete_route(&moderator, owner.id));
        assert!(can_delete_route(&admin, owner.id));
        assert_eq!(
            ensure_can_delete_route(&moderator, owner.id).unwrap_err(),
            Denied("You are not allowed to delete this route")
        );
    }

    #[test]
    fn comment_delete_matrix() {
        let author = Uuid::new_v4();
        let user = actor(UserRole::User);
        let moderator = actor(UserRole::Moderator);
        let admin = actor(UserRole::Admin);

        // Plain user's comment.
        assert!(!can_delete_comment(&user, author, UserRole::User));
        assert!(can_delete_comment(&moderator, author, UserRole::User));
        assert!(can_delete_comment(&admin, author, UserRole::User));

        // Moderator's comment.
        assert!(!can_delete_comment(&moderator, author, UserRole::Moderator));
        assert!(can_delete_comment(&admin, author, UserRole::Moderator));

        // Another admin's comment.
        assert!(!can_delete_comment(&moderator, author, UserRole::Admin));
        assert!(!can_delete_comment(&admin, author, UserRole::Admin));

        // Authors may always remove their own.
        assert!(can_delete_comment(&admin, admin.id, UserRole::Admin));
        assert!(can_delete_comment(&user, user.id, UserRole::User));
    }

    #[test]
    fn admins_cannot_target_themselves() {
        let admin = actor(UserRole::Admin);
        let me = User {
            id: admin.id,
            role: UserRole::Admin,
            ..User::default()
        };
        for action in [
            AccountAction::Delete,
            AccountAction::ResetPassword,
            AccountAction::ToggleBlock,
            AccountAction::ChangeRole,
        ] {
            assert!(ensure_can_manage_account(&admin, &me, action).is_err());
        }
    }

    #[test]
    fn other_admins_are_protected_from_delete_and_reset() {
        let admin = actor(UserRole::Admin);
        let other = account(UserRole::Admin);

        assert!(ensure_can_manage_account(&admin, &other, AccountAction::Delete).is_err());
        assert!(ensure_can_manage_account(&admin, &other, AccountAction::ResetPassword).is_err());
        assert!(ensure_can_manage_account(&admin, &other, AccountAction::ToggleBlock).is_ok());
        assert!(ensure_can_manage_account(&admin, &other, AccountAction::ChangeRole).is_ok());
    }

    #[test]
    fn non_admins_are_rejected() {
        let moderator = actor(UserRole::Moderator);
        let target = account(UserRole::User);
        assert_eq!(
            ensure_can_manage_account(&moderator, &target, AccountAction::Delete).unwrap_err(),
            Denied("Administrator privileges required")
        );
    }

    #[test]
    fn denied_maps_to_forbidden() {
        let err: AppError = Denied("nope").into();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}

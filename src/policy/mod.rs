//! Authorization predicates.
//!
//! Every check answers with a plain bool: a missing resource and a missing
//! permission are deliberately indistinguishable to the caller, so handlers
//! cannot leak whether something exists. Store failures also collapse to
//! `false`.

use crate::store::Store;
use crate::types::{InvitationStatus, User};

/// True iff the user holds a membership in the company through a role
/// flagged admin.
pub fn is_admin(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    store
        .get_membership_role(company_id, user_id)
        .ok()
        .flatten()
        .is_some_and(|role| role.is_admin)
}

fn is_member(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    store
        .get_company_for_user(company_id, user_id)
        .ok()
        .flatten()
        .is_some()
}

pub fn can_view_company(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_member(store, user_id, company_id)
}

pub fn can_view_company_users(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_member(store, user_id, company_id)
}

pub fn can_visit_company(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_member(store, user_id, company_id)
}

pub fn can_update_company(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_admin(store, user_id, company_id)
}

/// Creating, listing, and deleting company invitations is admin-only.
pub fn can_manage_invitations(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_admin(store, user_id, company_id)
}

/// An incoming invitation is visible only to the account whose registered
/// email it targets.
pub fn can_show_incoming_invitation(store: &dyn Store, user: &User, invitation_id: &str) -> bool {
    store
        .get_invitation(invitation_id)
        .ok()
        .flatten()
        .is_some_and(|invitation| invitation.email == user.email)
}

/// Responding additionally requires the invitation to still be awaiting;
/// terminal invitations cannot be responded to again.
pub fn can_respond_to_invitation(store: &dyn Store, user: &User, invitation_id: &str) -> bool {
    store
        .get_invitation(invitation_id)
        .ok()
        .flatten()
        .is_some_and(|invitation| {
            invitation.email == user.email
                && invitation.status == InvitationStatus::AwaitingResponse
        })
}

pub fn can_create_post(store: &dyn Store, user_id: &str, company_id: &str) -> bool {
    is_member(store, user_id, company_id)
}

/// Membership of the caller is assumed already checked upstream.
pub fn can_show_post(store: &dyn Store, post_id: &str, company_id: &str) -> bool {
    store
        .get_post_in_company(post_id, company_id)
        .ok()
        .flatten()
        .is_some()
}

/// Editing and deleting a post is reserved for its author.
pub fn can_modify_post(store: &dyn Store, user_id: &str, post_id: &str, company_id: &str) -> bool {
    store
        .get_post_in_company(post_id, company_id)
        .ok()
        .flatten()
        .is_some_and(|post| post.author_id == user_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::invite;
    use crate::store::SqliteStore;
    use crate::types::User;

    fn test_store() -> Arc<SqliteStore> {
        let store = SqliteStore::new(":memory:").unwrap();
        store.initialize().unwrap();
        Arc::new(store)
    }

    fn test_user(store: &dyn Store, name: &str, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            picture: None,
            activation_code: None,
            reset_code: None,
            reset_code_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();
        user
    }

    #[test]
    fn test_creator_is_admin() {
        let store = test_store();
        let user = test_user(store.as_ref(), "ada", "ada@example.com");
        let company = invite::create_company(
            store.as_ref(),
            &user,
            invite::NewCompany {
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(is_admin(store.as_ref(), &user.id, &company.id));
        assert!(can_view_company(store.as_ref(), &user.id, &company.id));
        assert!(can_manage_invitations(store.as_ref(), &user.id, &company.id));
    }

    #[test]
    fn test_non_member_sees_nothing() {
        let store = test_store();
        let owner = test_user(store.as_ref(), "ada", "ada@example.com");
        let outsider = test_user(store.as_ref(), "bob", "bob@example.com");
        let company = invite::create_company(
            store.as_ref(),
            &owner,
            invite::NewCompany {
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!is_admin(store.as_ref(), &outsider.id, &company.id));
        assert!(!can_view_company(store.as_ref(), &outsider.id, &company.id));
        assert!(!can_visit_company(store.as_ref(), &outsider.id, &company.id));
        assert!(!can_create_post(store.as_ref(), &outsider.id, &company.id));
    }

    #[test]
    fn test_respond_requires_matching_email_and_awaiting_status() {
        let store = test_store();
        let owner = test_user(store.as_ref(), "ada", "ada@example.com");
        let invitee = test_user(store.as_ref(), "bob", "bob@example.com");
        let other = test_user(store.as_ref(), "eve", "eve@example.com");
        let company = invite::create_company(
            store.as_ref(),
            &owner,
            invite::NewCompany {
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let invitation = invite::invite_one(
            store.as_ref(),
            &company.id,
            &owner.id,
            "bob@example.com",
            "join us",
        )
        .unwrap();
        let invitation = match invitation {
            invite::InviteOutcome::Invited(invitation) => invitation,
            invite::InviteOutcome::Rejected { reason, .. } => panic!("rejected: {reason}"),
        };

        assert!(can_show_incoming_invitation(
            store.as_ref(),
            &invitee,
            &invitation.id
        ));
        assert!(can_respond_to_invitation(
            store.as_ref(),
            &invitee,
            &invitation.id
        ));
        assert!(!can_respond_to_invitation(
            store.as_ref(),
            &other,
            &invitation.id
        ));

        invite::respond(store.as_ref(), &invitee, &invitation.id, false).unwrap();

        // Terminal invitations are closed to further responses.
        assert!(!can_respond_to_invitation(
            store.as_ref(),
            &invitee,
            &invitation.id
        ));
    }
}

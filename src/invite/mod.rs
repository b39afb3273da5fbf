//! Company membership and invitation engine.
//!
//! Owns the company creation transaction that seeds the admin/member role
//! pair, the concurrent bulk-invite dispatch, invitation listing, and the
//! transactional accept/decline path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mail::{self, Mailer};
use crate::store::Store;
use crate::types::{Company, Invitation, InvitationStatus, Membership, Role, User};

/// Number of concurrent invite workers per bulk call. A tunable constant,
/// never user-controlled.
pub const INVITE_WORKERS: usize = 10;

/// A stuck worker is reported as that email's failure instead of stalling
/// the whole response.
const INVITE_TIMEOUT: Duration = Duration::from_secs(30);

pub const INVITATION_PAGE_SIZE: i64 = 25;

const ADMIN_ROLE_NAME: &str = "Admin";
const MEMBER_ROLE_NAME: &str = "Member";

const REASON_ALREADY_MEMBER: &str = "already a member of the company";
const REASON_ALREADY_INVITED: &str = "already invited";
const REASON_CONNECTION: &str = "connection error, please retry";
const REASON_TIMEOUT: &str = "invite timed out, please retry";

#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Creates the company and seeds it in one transaction: the company row,
/// the admin and member roles, and the creator's membership bound to the
/// admin role. Nothing is observable if any step fails.
pub fn create_company(store: &dyn Store, creator: &User, input: NewCompany) -> Result<Company> {
    if store.find_company_by_slug(&input.slug, None)?.is_some() {
        return Err(Error::Business("Slug has already been taken.".to_string()));
    }

    let now = Utc::now();
    let company = Company {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        slug: input.slug,
        description: input.description,
        email: input.email,
        phone: input.phone,
        address: input.address,
        created_at: now,
        updated_at: now,
    };

    let admin_role = Role {
        id: Uuid::new_v4().to_string(),
        company_id: company.id.clone(),
        name: ADMIN_ROLE_NAME.to_string(),
        is_admin: true,
        created_at: now,
    };
    let member_role = Role {
        id: Uuid::new_v4().to_string(),
        company_id: company.id.clone(),
        name: MEMBER_ROLE_NAME.to_string(),
        is_admin: false,
        created_at: now,
    };
    let membership = Membership {
        company_id: company.id.clone(),
        user_id: creator.id.clone(),
        role_id: admin_role.id.clone(),
        last_visited_at: Some(now),
        created_at: now,
    };

    match store.create_company(&company, &admin_role, &member_role, &membership) {
        Ok(()) => Ok(company),
        // Lost a slug race to a concurrent creation; same outcome as the
        // pre-check.
        Err(Error::AlreadyExists) => {
            Err(Error::Business("Slug has already been taken.".to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Applies an edit, revalidating slug uniqueness against everything except
/// the company's own row.
pub fn update_company(
    store: &dyn Store,
    existing: &Company,
    input: NewCompany,
) -> Result<Company> {
    if store
        .find_company_by_slug(&input.slug, Some(&existing.id))?
        .is_some()
    {
        return Err(Error::Business("Slug has already been taken.".to_string()));
    }

    let company = Company {
        id: existing.id.clone(),
        name: input.name,
        slug: input.slug,
        description: input.description,
        email: input.email,
        phone: input.phone,
        address: input.address,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };

    store.update_company(&company)?;
    Ok(company)
}

#[derive(Debug)]
pub enum InviteOutcome {
    Invited(Invitation),
    Rejected { email: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedEmail {
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct InviteReport {
    pub invited: Vec<Invitation>,
    pub failed: Vec<RejectedEmail>,
}

/// Trim-based, case-sensitive, order-preserving dedup of the input list.
fn dedup_emails(emails: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    emails
        .iter()
        .map(|email| email.trim())
        .filter(|email| !email.is_empty())
        .filter(|email| seen.insert(email.to_string()))
        .map(str::to_string)
        .collect()
}

/// A single check-then-insert invite attempt. The existence checks produce
/// the friendly rejection reasons; the store's unique index on awaiting
/// (company, email) pairs is what actually holds when two calls race on the
/// same address.
pub fn invite_one(
    store: &dyn Store,
    company_id: &str,
    sender_id: &str,
    email: &str,
    message: &str,
) -> Result<InviteOutcome> {
    if store.is_member_email(company_id, email)? {
        return Ok(InviteOutcome::Rejected {
            email: email.to_string(),
            reason: REASON_ALREADY_MEMBER.to_string(),
        });
    }

    if store.get_awaiting_invitation(company_id, email)?.is_some() {
        return Ok(InviteOutcome::Rejected {
            email: email.to_string(),
            reason: REASON_ALREADY_INVITED.to_string(),
        });
    }

    let now = Utc::now();
    let invitation = Invitation {
        id: Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        email: email.to_string(),
        message: message.to_string(),
        sender_id: sender_id.to_string(),
        resolver_id: None,
        status: InvitationStatus::AwaitingResponse,
        created_at: now,
        updated_at: now,
    };

    match store.create_invitation(&invitation) {
        Ok(()) => Ok(InviteOutcome::Invited(invitation)),
        Err(Error::AlreadyExists) => Ok(InviteOutcome::Rejected {
            email: email.to_string(),
            reason: REASON_ALREADY_INVITED.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Fans the deduplicated email list out over a bounded pool of workers and
/// joins on all of them before returning. One email's failure never cancels
/// its siblings; an invitation mail goes out for each success.
pub async fn invite_emails(
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    company: &Company,
    sender: &User,
    emails: &[String],
    message: &str,
) -> InviteReport {
    let emails = dedup_emails(emails);
    let limiter = Arc::new(Semaphore::new(INVITE_WORKERS));
    let mut workers = JoinSet::new();

    for email in emails {
        let limiter = limiter.clone();
        let store = store.clone();
        let company_id = company.id.clone();
        let sender_id = sender.id.clone();
        let message = message.to_string();

        workers.spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return InviteOutcome::Rejected {
                        email,
                        reason: REASON_CONNECTION.to_string(),
                    };
                }
            };

            let worker_email = email.clone();
            let attempt = tokio::task::spawn_blocking(move || {
                invite_one(store.as_ref(), &company_id, &sender_id, &worker_email, &message)
            });

            match tokio::time::timeout(INVITE_TIMEOUT, attempt).await {
                Ok(Ok(Ok(outcome))) => outcome,
                Ok(Ok(Err(e))) => {
                    tracing::error!("invite for {email} failed: {e}");
                    InviteOutcome::Rejected {
                        email,
                        reason: REASON_CONNECTION.to_string(),
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!("invite worker for {email} panicked: {e}");
                    InviteOutcome::Rejected {
                        email,
                        reason: REASON_CONNECTION.to_string(),
                    }
                }
                Err(_) => {
                    tracing::warn!("invite for {email} timed out");
                    InviteOutcome::Rejected {
                        email,
                        reason: REASON_TIMEOUT.to_string(),
                    }
                }
            }
        });
    }

    let mut report = InviteReport::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(InviteOutcome::Invited(invitation)) => {
                mailer.send(&mail::invitation_mail(&invitation, company, sender));
                report.invited.push(invitation);
            }
            Ok(InviteOutcome::Rejected { email, reason }) => {
                report.failed.push(RejectedEmail { email, reason });
            }
            Err(e) => tracing::error!("invite worker lost: {e}"),
        }
    }

    report
}

/// Outgoing invitations for a company, newest first. `page <= 0` returns
/// everything; pages past the end come back empty.
pub fn list_outgoing(store: &dyn Store, company_id: &str, page: i64) -> Result<Vec<Invitation>> {
    if page <= 0 {
        store.list_company_invitations(company_id, -1, 0)
    } else {
        store.list_company_invitations(
            company_id,
            INVITATION_PAGE_SIZE,
            (page - 1) * INVITATION_PAGE_SIZE,
        )
    }
}

/// Accept or decline an invitation. Status change and (on accept) the
/// membership row commit or roll back together; a company missing its
/// member role aborts the whole operation.
pub fn respond(
    store: &dyn Store,
    user: &User,
    invitation_id: &str,
    is_join: bool,
) -> Result<Invitation> {
    let invitation = store.get_invitation(invitation_id)?.ok_or(Error::NotFound)?;

    // A tombstoned company cannot be joined or declined into.
    if store.get_company(&invitation.company_id)?.is_none() {
        return Err(Error::NotFound);
    }

    let (status, membership) = if is_join {
        let role = store
            .get_plain_role(&invitation.company_id)?
            .ok_or(Error::MissingMemberRole)?;
        let membership = Membership {
            company_id: invitation.company_id.clone(),
            user_id: user.id.clone(),
            role_id: role.id,
            last_visited_at: None,
            created_at: Utc::now(),
        };
        (InvitationStatus::Joined, Some(membership))
    } else {
        (InvitationStatus::Declined, None)
    };

    store.resolve_invitation(invitation_id, &user.id, status, membership.as_ref())?;

    store.get_invitation(invitation_id)?.ok_or(Error::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_trims_and_preserves_order() {
        let input = vec![
            " a@x.com ".to_string(),
            "a@x.com".to_string(),
            "b@x.com".to_string(),
            "".to_string(),
            "  ".to_string(),
            "A@x.com".to_string(),
        ];
        // Case-sensitive: "A@x.com" is distinct from "a@x.com".
        assert_eq!(dedup_emails(&input), vec!["a@x.com", "b@x.com", "A@x.com"]);
    }

    #[test]
    fn test_dedup_empty_input() {
        assert!(dedup_emails(&[]).is_empty());
    }
}

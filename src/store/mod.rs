mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Parameters of a post feed query. The cursor pair describes the last item
/// of the previous page; `basis` is the timestamp the ordering (and the
/// cursor comparison) runs over.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub company_id: String,
    pub author_id: Option<String>,
    pub status: PostStatus,
    pub cursor: Option<FeedCursor>,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct FeedCursor {
    pub last_id: String,
    pub last_seen: DateTime<Utc>,
}

/// Store defines the database interface. All reads exclude soft-deleted
/// rows; multi-step writes run inside a single transaction.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn update_profile(&self, id: &str, name: &str, picture: Option<&str>) -> Result<()>;
    fn update_password(&self, id: &str, password_hash: &str) -> Result<()>;
    fn set_activation_code(&self, id: &str, code: &str) -> Result<()>;
    fn clear_activation_code(&self, id: &str) -> Result<()>;
    fn set_reset_code(&self, id: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()>;
    fn clear_reset_code(&self, id: &str) -> Result<()>;

    // Session token operations
    fn create_session(&self, token: &SessionToken) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<SessionToken>>;
    fn touch_session(&self, id: &str) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;

    // Company operations. create_company seeds both roles and the creator's
    // membership in one transaction; nothing is observable on failure.
    fn create_company(
        &self,
        company: &Company,
        admin_role: &Role,
        member_role: &Role,
        membership: &Membership,
    ) -> Result<()>;
    fn get_company(&self, id: &str) -> Result<Option<Company>>;
    fn get_company_for_user(&self, company_id: &str, user_id: &str) -> Result<Option<Company>>;
    fn find_company_by_slug(&self, slug: &str, exclude_id: Option<&str>)
    -> Result<Option<Company>>;
    fn update_company(&self, company: &Company) -> Result<()>;
    fn delete_company(&self, id: &str) -> Result<bool>;
    fn list_user_companies(&self, user_id: &str) -> Result<Vec<CompanySummary>>;
    fn list_company_members(&self, company_id: &str) -> Result<Vec<Member>>;
    fn touch_membership_visit(&self, company_id: &str, user_id: &str) -> Result<()>;
    fn get_membership_role(&self, company_id: &str, user_id: &str) -> Result<Option<Role>>;
    fn get_plain_role(&self, company_id: &str) -> Result<Option<Role>>;

    // Invitation operations
    fn create_invitation(&self, invitation: &Invitation) -> Result<()>;
    fn get_invitation(&self, id: &str) -> Result<Option<Invitation>>;
    fn get_invitation_in_company(&self, id: &str, company_id: &str) -> Result<Option<Invitation>>;
    fn get_awaiting_invitation(&self, company_id: &str, email: &str)
    -> Result<Option<Invitation>>;
    fn is_member_email(&self, company_id: &str, email: &str) -> Result<bool>;
    /// `limit < 0` returns the whole list.
    fn list_company_invitations(
        &self,
        company_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invitation>>;
    fn list_invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>>;
    /// Transitions an awaiting invitation into a terminal status and, when
    /// joining, writes the membership row, all in one transaction. Fails
    /// with `Error::InvitationResolved` if the row is no longer awaiting.
    fn resolve_invitation(
        &self,
        invitation_id: &str,
        resolver_id: &str,
        status: InvitationStatus,
        membership: Option<&Membership>,
    ) -> Result<()>;
    fn delete_invitation(&self, id: &str) -> Result<bool>;

    // Post operations
    fn save_post(&self, post: &Post) -> Result<()>;
    fn get_post_in_company(&self, post_id: &str, company_id: &str) -> Result<Option<Post>>;
    fn get_post_detail(&self, post_id: &str) -> Result<Option<PostWithAuthor>>;
    fn list_posts(&self, query: &FeedQuery) -> Result<Vec<PostWithAuthor>>;
    fn delete_post(&self, id: &str) -> Result<bool>;
}

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};

use super::schema::SCHEMA;
use super::{FeedQuery, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|s| parse_datetime(&s))
}

/// Fixed-width encoding (microseconds, Z suffix) so that string comparison
/// in SQL matches chronological order; the feed cursor predicate depends on
/// this.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_datetime_opt(dt: &Option<DateTime<Utc>>) -> Option<String> {
    dt.as_ref().map(format_datetime)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn invitation_status(value: i64) -> InvitationStatus {
    InvitationStatus::from_i64(value).unwrap_or_else(|| {
        tracing::error!("Invalid invitation status in database: {value}");
        InvitationStatus::AwaitingResponse
    })
}

fn post_status(value: i64) -> PostStatus {
    PostStatus::from_i64(value).unwrap_or_else(|| {
        tracing::error!("Invalid post status in database: {value}");
        PostStatus::Draft
    })
}

const USER_COLUMNS: &str = "id, name, email, password_hash, picture, activation_code, \
     reset_code, reset_code_expires_at, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        picture: row.get(4)?,
        activation_code: row.get(5)?,
        reset_code: row.get(6)?,
        reset_code_expires_at: parse_datetime_opt(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

const COMPANY_COLUMNS: &str =
    "id, name, slug, description, email, phone, address, created_at, updated_at";

fn map_company(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const INVITATION_COLUMNS: &str =
    "id, company_id, email, message, sender_id, resolver_id, status, created_at, updated_at";

fn map_invitation(row: &Row<'_>) -> rusqlite::Result<Invitation> {
    Ok(Invitation {
        id: row.get(0)?,
        company_id: row.get(1)?,
        email: row.get(2)?,
        message: row.get(3)?,
        sender_id: row.get(4)?,
        resolver_id: row.get(5)?,
        status: invitation_status(row.get(6)?),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn map_role(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        company_id: row.get(1)?,
        author_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        status: post_status(row.get(5)?),
        scheduled_at: parse_datetime_opt(row.get(6)?),
        published_at: parse_datetime_opt(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn map_post_with_author(row: &Row<'_>) -> rusqlite::Result<PostWithAuthor> {
    Ok(PostWithAuthor {
        post: map_post(row)?,
        author: PostAuthor {
            id: row.get(10)?,
            name: row.get(11)?,
            email: row.get(12)?,
        },
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, picture, activation_code,
                     reset_code, reset_code_expires_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.picture,
                    user.activation_code,
                    user.reset_code,
                    format_datetime_opt(&user.reset_code_expires_at),
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"),
            params![id],
            map_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND deleted_at IS NULL"),
            params![email],
            map_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_profile(&self, id: &str, name: &str, picture: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET name = ?1, picture = ?2, updated_at = ?3
             WHERE id = ?4 AND deleted_at IS NULL",
            params![name, picture, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![password_hash, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_activation_code(&self, id: &str, code: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET activation_code = ?1, updated_at = ?2
             WHERE id = ?3 AND deleted_at IS NULL",
            params![code, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn clear_activation_code(&self, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET activation_code = NULL, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_reset_code(&self, id: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET reset_code = ?1, reset_code_expires_at = ?2, updated_at = ?3
             WHERE id = ?4 AND deleted_at IS NULL",
            params![
                code,
                format_datetime(&expires_at),
                format_datetime(&Utc::now()),
                id
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn clear_reset_code(&self, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET reset_code = NULL, reset_code_expires_at = NULL, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Session token operations

    fn create_session(&self, token: &SessionToken) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO session_tokens (id, token_hash, token_lookup, user_id,
                     created_at, expires_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    token.id,
                    token.token_hash,
                    token.token_lookup,
                    token.user_id,
                    format_datetime(&token.created_at),
                    format_datetime_opt(&token.expires_at),
                    format_datetime_opt(&token.last_used_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<SessionToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM session_tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(SessionToken {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: parse_datetime_opt(row.get(5)?),
                    last_used_at: parse_datetime_opt(row.get(6)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn touch_session(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE session_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM session_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Company operations

    fn create_company(
        &self,
        company: &Company,
        admin_role: &Role,
        member_role: &Role,
        membership: &Membership,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO companies (id, name, slug, description, email, phone, address,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                company.id,
                company.name,
                company.slug,
                company.description,
                company.email,
                company.phone,
                company.address,
                format_datetime(&company.created_at),
                format_datetime(&company.updated_at),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::AlreadyExists
            } else {
                Error::from(e)
            }
        })?;

        for role in [admin_role, member_role] {
            tx.execute(
                "INSERT INTO roles (id, company_id, name, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    role.id,
                    role.company_id,
                    role.name,
                    role.is_admin,
                    format_datetime(&role.created_at),
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO memberships (company_id, user_id, role_id, last_visited_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                membership.company_id,
                membership.user_id,
                membership.role_id,
                format_datetime_opt(&membership.last_visited_at),
                format_datetime(&membership.created_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1 AND deleted_at IS NULL"
            ),
            params![id],
            map_company,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_company_for_user(&self, company_id: &str, user_id: &str) -> Result<Option<Company>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT C.id, C.name, C.slug, C.description, C.email, C.phone, C.address,
                    C.created_at, C.updated_at
             FROM companies C
             JOIN memberships M ON M.company_id = C.id
             WHERE C.id = ?1 AND M.user_id = ?2 AND C.deleted_at IS NULL",
            params![company_id, user_id],
            map_company,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_company_by_slug(
        &self,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<Company>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {COMPANY_COLUMNS} FROM companies
                 WHERE slug = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR id <> ?2)"
            ),
            params![slug, exclude_id],
            map_company,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_company(&self, company: &Company) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE companies SET name = ?1, slug = ?2, description = ?3, email = ?4,
                 phone = ?5, address = ?6, updated_at = ?7
             WHERE id = ?8 AND deleted_at IS NULL",
            params![
                company.name,
                company.slug,
                company.description,
                company.email,
                company.phone,
                company.address,
                format_datetime(&Utc::now()),
                company.id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_company(&self, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE companies SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn list_user_companies(&self, user_id: &str) -> Result<Vec<CompanySummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT C.id, C.name, R.is_admin, M.last_visited_at
             FROM companies C
             JOIN memberships M ON M.company_id = C.id
             JOIN roles R ON R.id = M.role_id
             WHERE M.user_id = ?1 AND C.deleted_at IS NULL
             ORDER BY M.last_visited_at IS NULL, M.last_visited_at DESC, C.name ASC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(CompanySummary {
                company_id: row.get(0)?,
                name: row.get(1)?,
                is_admin: row.get(2)?,
                last_visited_at: parse_datetime_opt(row.get(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_company_members(&self, company_id: &str) -> Result<Vec<Member>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT U.id, U.name, U.email, R.name, R.is_admin
             FROM memberships M
             JOIN users U ON U.id = M.user_id
             JOIN roles R ON R.id = M.role_id
             WHERE M.company_id = ?1 AND U.deleted_at IS NULL
             ORDER BY U.name ASC",
        )?;

        let rows = stmt.query_map(params![company_id], |row| {
            Ok(Member {
                user_id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role_name: row.get(3)?,
                is_admin: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn touch_membership_visit(&self, company_id: &str, user_id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE memberships SET last_visited_at = ?1
             WHERE company_id = ?2 AND user_id = ?3",
            params![format_datetime(&Utc::now()), company_id, user_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn get_membership_role(&self, company_id: &str, user_id: &str) -> Result<Option<Role>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT R.id, R.company_id, R.name, R.is_admin, R.created_at
             FROM memberships M
             JOIN roles R ON R.id = M.role_id
             JOIN companies C ON C.id = M.company_id
             WHERE M.company_id = ?1 AND M.user_id = ?2 AND C.deleted_at IS NULL",
            params![company_id, user_id],
            map_role,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_plain_role(&self, company_id: &str) -> Result<Option<Role>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, company_id, name, is_admin, created_at
             FROM roles WHERE company_id = ?1 AND is_admin = 0
             ORDER BY created_at ASC LIMIT 1",
            params![company_id],
            map_role,
        )
        .optional()
        .map_err(Error::from)
    }

    // Invitation operations

    fn create_invitation(&self, invitation: &Invitation) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO invitations (id, company_id, email, message, sender_id,
                     resolver_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    invitation.id,
                    invitation.company_id,
                    invitation.email,
                    invitation.message,
                    invitation.sender_id,
                    invitation.resolver_id,
                    invitation.status.as_i64(),
                    format_datetime(&invitation.created_at),
                    format_datetime(&invitation.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_invitation(&self, id: &str) -> Result<Option<Invitation>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {INVITATION_COLUMNS} FROM invitations
                 WHERE id = ?1 AND deleted_at IS NULL"
            ),
            params![id],
            map_invitation,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_invitation_in_company(&self, id: &str, company_id: &str) -> Result<Option<Invitation>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {INVITATION_COLUMNS} FROM invitations
                 WHERE id = ?1 AND company_id = ?2 AND deleted_at IS NULL"
            ),
            params![id, company_id],
            map_invitation,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_awaiting_invitation(
        &self,
        company_id: &str,
        email: &str,
    ) -> Result<Option<Invitation>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {INVITATION_COLUMNS} FROM invitations
                 WHERE company_id = ?1 AND email = ?2 AND status = 0 AND deleted_at IS NULL"
            ),
            params![company_id, email],
            map_invitation,
        )
        .optional()
        .map_err(Error::from)
    }

    fn is_member_email(&self, company_id: &str, email: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memberships M
             JOIN users U ON U.id = M.user_id
             WHERE M.company_id = ?1 AND U.email = ?2 AND U.deleted_at IS NULL",
            params![company_id, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_company_invitations(
        &self,
        company_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invitation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations
             WHERE company_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![company_id, limit, offset], map_invitation)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_invitations_for_email(&self, email: &str) -> Result<Vec<Invitation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations
             WHERE email = ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map(params![email], map_invitation)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn resolve_invitation(
        &self,
        invitation_id: &str,
        resolver_id: &str,
        status: InvitationStatus,
        membership: Option<&Membership>,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // The status guard here, inside the transaction, is what makes a
        // second response lose even when both passed the policy check.
        let rows = tx.execute(
            "UPDATE invitations SET status = ?1, resolver_id = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 0 AND deleted_at IS NULL",
            params![
                status.as_i64(),
                resolver_id,
                format_datetime(&Utc::now()),
                invitation_id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::InvitationResolved);
        }

        if let Some(membership) = membership {
            // A stale membership row (e.g. re-joining after the company was
            // reseeded) is reused rather than duplicated.
            tx.execute(
                "INSERT INTO memberships (company_id, user_id, role_id, last_visited_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(company_id, user_id) DO UPDATE SET role_id = excluded.role_id",
                params![
                    membership.company_id,
                    membership.user_id,
                    membership.role_id,
                    format_datetime_opt(&membership.last_visited_at),
                    format_datetime(&membership.created_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_invitation(&self, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE invitations SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    // Post operations

    fn save_post(&self, post: &Post) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO posts (id, company_id, author_id, title, content, status,
                 scheduled_at, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 content = excluded.content,
                 status = excluded.status,
                 scheduled_at = excluded.scheduled_at,
                 published_at = excluded.published_at,
                 updated_at = excluded.updated_at",
            params![
                post.id,
                post.company_id,
                post.author_id,
                post.title,
                post.content,
                post.status.as_i64(),
                format_datetime_opt(&post.scheduled_at),
                format_datetime_opt(&post.published_at),
                format_datetime(&post.created_at),
                format_datetime(&post.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_post_in_company(&self, post_id: &str, company_id: &str) -> Result<Option<Post>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, company_id, author_id, title, content, status, scheduled_at,
                    published_at, created_at, updated_at
             FROM posts WHERE id = ?1 AND company_id = ?2 AND deleted_at IS NULL",
            params![post_id, company_id],
            map_post,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_post_detail(&self, post_id: &str) -> Result<Option<PostWithAuthor>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT P.id, P.company_id, P.author_id, P.title, P.content, P.status,
                    P.scheduled_at, P.published_at, P.created_at, P.updated_at,
                    U.id, U.name, U.email
             FROM posts P
             JOIN users U ON U.id = P.author_id
             WHERE P.id = ?1 AND P.deleted_at IS NULL",
            params![post_id],
            map_post_with_author,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_posts(&self, query: &FeedQuery) -> Result<Vec<PostWithAuthor>> {
        // published_at orders the published feed; everything else pages over
        // the edit timestamp.
        let basis = if query.status == PostStatus::Published {
            "P.published_at"
        } else {
            "P.updated_at"
        };

        let mut sql = String::from(
            "SELECT P.id, P.company_id, P.author_id, P.title, P.content, P.status,
                    P.scheduled_at, P.published_at, P.created_at, P.updated_at,
                    U.id, U.name, U.email
             FROM posts P
             JOIN users U ON U.id = P.author_id
             WHERE P.company_id = ? AND P.status = ? AND P.deleted_at IS NULL",
        );
        let mut args: Vec<Box<dyn ToSql>> = vec![
            Box::new(query.company_id.clone()),
            Box::new(query.status.as_i64()),
        ];

        if query.status == PostStatus::Published {
            sql.push_str(" AND P.published_at IS NOT NULL");
        }

        if let Some(author_id) = &query.author_id {
            sql.push_str(" AND P.author_id = ?");
            args.push(Box::new(author_id.clone()));
        }

        if let Some(cursor) = &query.cursor {
            let last_seen = format_datetime(&cursor.last_seen);
            sql.push_str(&format!(
                " AND ({basis} < ? OR ({basis} = ? AND P.id < ?))"
            ));
            args.push(Box::new(last_seen.clone()));
            args.push(Box::new(last_seen));
            args.push(Box::new(cursor.last_id.clone()));
        }

        sql.push_str(&format!(" ORDER BY {basis} DESC, P.id DESC LIMIT ?"));
        args.push(Box::new(query.limit));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            map_post_with_author,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_post(&self, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE posts SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }
}

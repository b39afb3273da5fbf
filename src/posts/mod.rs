//! Post engine: validation, transactional save, and the keyset-paginated
//! feed query.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{FeedCursor, FeedQuery, Store};
use crate::types::{Post, PostStatus, PostWithAuthor};

pub const FEED_DEFAULT_LIMIT: i64 = 10;

/// A scheduled post must be scheduled strictly more than this far ahead.
const MIN_SCHEDULE_LEAD_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Checked on every create and edit; never re-checked later. There is no
/// background job promoting Scheduled to Published.
pub fn validate(draft: &PostDraft, now: DateTime<Utc>) -> Result<()> {
    if draft.status != PostStatus::Scheduled {
        return Ok(());
    }

    let Some(scheduled_at) = draft.scheduled_at else {
        return Err(Error::Validation(vec![
            "Schedule datetime must be set.".to_string(),
        ]));
    };

    // Strictly after the cutoff: now + 15min exactly is still too soon.
    if scheduled_at <= now + Duration::minutes(MIN_SCHEDULE_LEAD_MINUTES) {
        return Err(Error::Validation(vec![
            "Schedule datetime must be at least 15 minutes later.".to_string(),
        ]));
    }

    Ok(())
}

/// Scheduled keeps the client-supplied datetime; Published is stamped with
/// the server clock regardless of what the client sent; Draft carries
/// neither.
fn apply_status_timestamps(draft: &PostDraft, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match draft.status {
        PostStatus::Scheduled => (draft.scheduled_at, None),
        PostStatus::Published => (None, Some(now)),
        PostStatus::Draft => (None, None),
    }
}

pub fn create_post(
    store: &dyn Store,
    author_id: &str,
    company_id: &str,
    draft: PostDraft,
) -> Result<Post> {
    let now = Utc::now();
    validate(&draft, now)?;

    let (scheduled_at, published_at) = apply_status_timestamps(&draft, now);
    let post = Post {
        id: Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        author_id: author_id.to_string(),
        title: draft.title,
        content: draft.content,
        status: draft.status,
        scheduled_at,
        published_at,
        created_at: now,
        updated_at: now,
    };

    store.save_post(&post)?;
    Ok(post)
}

pub fn edit_post(store: &dyn Store, existing: &Post, draft: PostDraft) -> Result<Post> {
    let now = Utc::now();
    validate(&draft, now)?;

    let (scheduled_at, published_at) = apply_status_timestamps(&draft, now);
    let post = Post {
        id: existing.id.clone(),
        company_id: existing.company_id.clone(),
        author_id: existing.author_id.clone(),
        title: draft.title,
        content: draft.content,
        status: draft.status,
        scheduled_at,
        published_at,
        created_at: existing.created_at,
        updated_at: now,
    };

    store.save_post(&post)?;
    Ok(post)
}

#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub company_id: String,
    pub author_id: Option<String>,
    pub status: Option<PostStatus>,
    pub last_id: Option<String>,
    pub last_published: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Feed pages are ordered by the basis timestamp descending with id as the
/// tiebreak; the cursor reproduces `ts < last OR (ts = last AND id < last)`
/// so rows sharing a timestamp are neither skipped nor repeated across
/// pages. An incomplete cursor falls back to the first page.
pub fn feed(store: &dyn Store, request: FeedRequest) -> Result<Vec<PostWithAuthor>> {
    let status = request.status.unwrap_or(PostStatus::Published);
    let limit = request
        .limit
        .filter(|&limit| limit > 0)
        .unwrap_or(FEED_DEFAULT_LIMIT);

    let last_seen = if status == PostStatus::Published {
        request.last_published
    } else {
        request.last_updated
    };
    let cursor = match (request.last_id, last_seen) {
        (Some(last_id), Some(last_seen)) => Some(FeedCursor { last_id, last_seen }),
        _ => None,
    };

    store.list_posts(&FeedQuery {
        company_id: request.company_id,
        author_id: request.author_id,
        status,
        cursor,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(status: PostStatus, scheduled_at: Option<DateTime<Utc>>) -> PostDraft {
        PostDraft {
            title: "title".to_string(),
            content: "content".to_string(),
            status,
            scheduled_at,
        }
    }

    #[test]
    fn test_draft_and_published_need_no_schedule() {
        let now = Utc::now();
        assert!(validate(&draft(PostStatus::Draft, None), now).is_ok());
        assert!(validate(&draft(PostStatus::Published, None), now).is_ok());
    }

    #[test]
    fn test_scheduled_requires_datetime() {
        let now = Utc::now();
        let result = validate(&draft(PostStatus::Scheduled, None), now);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_schedule_boundary_is_strictly_after() {
        let now = Utc::now();

        let too_soon = draft(PostStatus::Scheduled, Some(now + Duration::minutes(14)));
        assert!(matches!(
            validate(&too_soon, now),
            Err(Error::Validation(_))
        ));

        let exactly = draft(PostStatus::Scheduled, Some(now + Duration::minutes(15)));
        assert!(matches!(validate(&exactly, now), Err(Error::Validation(_))));

        let just_after = draft(
            PostStatus::Scheduled,
            Some(now + Duration::minutes(15) + Duration::seconds(1)),
        );
        assert!(validate(&just_after, now).is_ok());
    }
}

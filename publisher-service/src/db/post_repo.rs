use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Post, PostContentType, PostStatus};

pub async fn create_post(
    pool: &PgPool,
    instagram_account_id: Uuid,
    title: &str,
    caption: Option<&str>,
    hashtags: Option<&str>,
    content_type: PostContentType,
    media_urls: &[String],
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (instagram_account_id, title, caption, hashtags, content_type, media_urls)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(instagram_account_id)
    .bind(title)
    .bind(caption)
    .bind(hashtags)
    .bind(content_type)
    .bind(media_urls)
    .fetch_one(pool)
    .await
}

pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, instagram_account_id, title, caption, hashtags, content_type, status,
               media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
               error_message, claimed_at, created_at, updated_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_posts_by_account(
    pool: &PgPool,
    instagram_account_id: Uuid,
    status: Option<PostStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, instagram_account_id, title, caption, hashtags, content_type, status,
               media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
               error_message, claimed_at, created_at, updated_at
        FROM posts
        WHERE instagram_account_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(instagram_account_id)
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Content fields are only writable while the post is a draft.
pub async fn update_draft_content(
    pool: &PgPool,
    post_id: Uuid,
    title: &str,
    caption: Option<&str>,
    hashtags: Option<&str>,
    media_urls: &[String],
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = $2, caption = $3, hashtags = $4, media_urls = $5, updated_at = NOW()
        WHERE id = $1 AND status = 'draft'
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(title)
    .bind(caption)
    .bind(hashtags)
    .bind(media_urls)
    .fetch_optional(pool)
    .await
}

pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves a draft or failed post onto the schedule. Returns None when the
/// post is missing or not in a schedulable state.
pub async fn schedule_post(
    pool: &PgPool,
    post_id: Uuid,
    scheduled_at: DateTime<Utc>,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET status = 'scheduled', scheduled_at = $2, error_message = NULL, updated_at = NOW()
        WHERE id = $1 AND status IN ('draft', 'failed')
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(scheduled_at)
    .fetch_optional(pool)
    .await
}

/// Moves an already-scheduled post to a new fire time. Returns None when the
/// post is missing or no longer scheduled.
pub async fn reschedule_post(
    pool: &PgPool,
    post_id: Uuid,
    scheduled_at: DateTime<Utc>,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET scheduled_at = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'scheduled'
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(scheduled_at)
    .fetch_optional(pool)
    .await
}

/// Takes a scheduled post back to draft and clears its schedule metadata.
pub async fn unschedule_post(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET status = 'draft', scheduled_at = NULL, scheduled_task_ref = NULL, updated_at = NOW()
        WHERE id = $1 AND status = 'scheduled'
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Records the handle of the delayed task registered for this post. Kept
/// best-effort: callers log and continue when this loses a race with a
/// concurrent status change.
pub async fn set_task_ref(
    pool: &PgPool,
    post_id: Uuid,
    task_ref: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET scheduled_task_ref = $2, updated_at = NOW() WHERE id = $1")
        .bind(post_id)
        .bind(task_ref)
        .execute(pool)
        .await?;

    Ok(())
}

/// Posts for one account scheduled inside a time window, calendar order.
pub async fn list_posts_in_range(
    pool: &PgPool,
    instagram_account_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, instagram_account_id, title, caption, hashtags, content_type, status,
               media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
               error_message, claimed_at, created_at, updated_at
        FROM posts
        WHERE instagram_account_id = $1
          AND scheduled_at >= $2 AND scheduled_at <= $3
        ORDER BY scheduled_at ASC
        "#,
    )
    .bind(instagram_account_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// The next scheduled posts for an account, soonest first.
pub async fn find_upcoming_scheduled(
    pool: &PgPool,
    instagram_account_id: Uuid,
    limit: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, instagram_account_id, title, caption, hashtags, content_type, status,
               media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
               error_message, claimed_at, created_at, updated_at
        FROM posts
        WHERE instagram_account_id = $1 AND status = 'scheduled'
        ORDER BY scheduled_at ASC
        LIMIT $2
        "#,
    )
    .bind(instagram_account_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Scheduled posts whose fire time has passed, oldest first.
pub async fn find_due_scheduled(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, instagram_account_id, title, caption, hashtags, content_type, status,
               media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
               error_message, claimed_at, created_at, updated_at
        FROM posts
        WHERE status = 'scheduled' AND scheduled_at <= $1
        ORDER BY scheduled_at ASC
        LIMIT $2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Atomic claim: SCHEDULED -> PUBLISHING. At most one caller gets the row
/// back; everyone else sees None and must walk away.
pub async fn claim_for_publishing(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET status = 'publishing', claimed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'scheduled'
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Terminal success transition, all fields in one statement.
pub async fn mark_published(
    pool: &PgPool,
    post_id: Uuid,
    instagram_post_id: &str,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET status = 'published', published_at = NOW(), instagram_post_id = $2,
            error_message = NULL, claimed_at = NULL, scheduled_task_ref = NULL,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(instagram_post_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_failed(
    pool: &PgPool,
    post_id: Uuid,
    error_message: &str,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET status = 'failed', error_message = $2, claimed_at = NULL,
            scheduled_task_ref = NULL, updated_at = NOW()
        WHERE id = $1
        RETURNING id, instagram_account_id, title, caption, hashtags, content_type, status,
                  media_urls, scheduled_at, published_at, instagram_post_id, scheduled_task_ref,
                  error_message, claimed_at, created_at, updated_at
        "#,
    )
    .bind(post_id)
    .bind(error_message)
    .fetch_optional(pool)
    .await
}

/// Fails posts stuck in PUBLISHING since before the cutoff. A crashed worker
/// may or may not have committed the container, so the row is parked as
/// FAILED for an operator instead of being silently retried.
pub async fn fail_stale_publishing(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    error_message: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE posts
        SET status = 'failed', error_message = $2, claimed_at = NULL,
            scheduled_task_ref = NULL, updated_at = NOW()
        WHERE status = 'publishing' AND claimed_at < $1
        RETURNING id
        "#,
    )
    .bind(cutoff)
    .bind(error_message)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

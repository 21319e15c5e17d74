use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{account_repo, post_repo};
use crate::error::{AppError, Result};
use crate::models::{CreatePostRequest, Post, PostStatus, UpdatePostRequest};
use crate::services::instagram::PublishContent;
use crate::services::tasks::TaskScheduler;

/// Post lifecycle outside of publishing itself: CRUD plus moving posts on
/// and off the schedule. Scheduler calls are best-effort, the reconciliation
/// sweep covers any trigger that failed to register.
pub struct PostService {
    db: PgPool,
    scheduler: Arc<dyn TaskScheduler>,
}

impl PostService {
    pub fn new(db: PgPool, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self { db, scheduler }
    }

    pub async fn create_post(&self, request: CreatePostRequest) -> Result<Post> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }

        account_repo::find_account_by_id(&self.db, request.instagram_account_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Instagram account {} does not exist",
                    request.instagram_account_id
                ))
            })?;

        let post = post_repo::create_post(
            &self.db,
            request.instagram_account_id,
            request.title.trim(),
            request.caption.as_deref(),
            request.hashtags.as_deref(),
            request.content_type,
            &request.media_urls,
        )
        .await?;

        info!("Created {} post {}", post.content_type.as_str(), post.id);

        if let Some(scheduled_at) = request.scheduled_at {
            return self.schedule_post(post.id, scheduled_at).await;
        }
        Ok(post)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        post_repo::find_post_by_id(&self.db, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} does not exist", post_id)))
    }

    pub async fn list_posts(
        &self,
        instagram_account_id: Uuid,
        status: Option<PostStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let posts = post_repo::list_posts_by_account(
            &self.db,
            instagram_account_id,
            status,
            limit.clamp(1, 100),
            offset.max(0),
        )
        .await?;

        Ok(posts)
    }

    pub async fn update_post(&self, post_id: Uuid, request: UpdatePostRequest) -> Result<Post> {
        let post = self.get_post(post_id).await?;
        if post.status != PostStatus::Draft {
            return Err(AppError::Validation(format!(
                "Only draft posts can be edited, post {} is {}",
                post_id,
                post.status.as_str()
            )));
        }

        let title = request.title.unwrap_or(post.title);
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        let caption = request.caption.or(post.caption);
        let hashtags = request.hashtags.or(post.hashtags);
        let media_urls = request.media_urls.unwrap_or(post.media_urls);

        post_repo::update_draft_content(
            &self.db,
            post_id,
            title.trim(),
            caption.as_deref(),
            hashtags.as_deref(),
            &media_urls,
        )
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Post {} left the draft state during the update", post_id))
        })
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let post = self.get_post(post_id).await?;
        if post.status == PostStatus::Publishing {
            return Err(AppError::Validation(format!(
                "Post {} is being published and cannot be deleted right now",
                post_id
            )));
        }

        if post.status == PostStatus::Scheduled {
            if let Err(e) = self.scheduler.cancel_publish(post_id).await {
                warn!("Could not cancel publish task for post {}: {}", post_id, e);
            }
        }

        post_repo::delete_post(&self.db, post_id).await?;
        info!("Deleted post {}", post_id);
        Ok(())
    }

    /// Moves a draft or failed post onto the schedule and registers the
    /// delayed trigger. A scheduler outage does not unschedule the post, the
    /// sweep publishes it once it is due.
    pub async fn schedule_post(&self, post_id: Uuid, scheduled_at: DateTime<Utc>) -> Result<Post> {
        let post = self.get_post(post_id).await?;
        if post.status != PostStatus::Draft && post.status != PostStatus::Failed {
            return Err(AppError::Validation(format!(
                "Only draft or failed posts can be scheduled, post {} is {}",
                post_id,
                post.status.as_str()
            )));
        }
        // A past scheduled_at is accepted and means "publish as soon as possible".

        // Content completeness gate; publishing would hit the same checks.
        PublishContent::from_post(&post)?;

        let mut post = post_repo::schedule_post(&self.db, post_id, scheduled_at)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Post {} changed state before it could be scheduled",
                    post_id
                ))
            })?;

        match self.scheduler.schedule_publish(post_id, scheduled_at).await {
            Ok(task_ref) => {
                if let Err(e) = post_repo::set_task_ref(&self.db, post_id, Some(&task_ref)).await {
                    warn!("Could not persist task ref for post {}: {}", post_id, e);
                } else {
                    post.scheduled_task_ref = Some(task_ref);
                }
            }
            Err(e) => {
                warn!(
                    "Task registration for post {} failed, the sweep will publish it: {}",
                    post_id, e
                );
            }
        }

        info!("Scheduled post {} for {}", post_id, scheduled_at);
        Ok(post)
    }

    /// Moves an already-scheduled post to a new fire time. The old trigger is
    /// replaced, never accumulated: one post, one task.
    pub async fn reschedule_post(
        &self,
        post_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Post> {
        let post = self.get_post(post_id).await?;
        if post.status != PostStatus::Scheduled {
            return Err(AppError::Validation(format!(
                "Only scheduled posts can be rescheduled, post {} is {}",
                post_id,
                post.status.as_str()
            )));
        }

        let mut post = post_repo::reschedule_post(&self.db, post_id, scheduled_at)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Post {} changed state before it could be rescheduled",
                    post_id
                ))
            })?;

        match self
            .scheduler
            .reschedule_publish(post_id, scheduled_at)
            .await
        {
            Ok(task_ref) => {
                if let Err(e) = post_repo::set_task_ref(&self.db, post_id, Some(&task_ref)).await {
                    warn!("Could not persist task ref for post {}: {}", post_id, e);
                } else {
                    post.scheduled_task_ref = Some(task_ref);
                }
            }
            Err(e) => {
                warn!(
                    "Task rescheduling for post {} failed, the sweep will publish it: {}",
                    post_id, e
                );
            }
        }

        info!("Rescheduled post {} for {}", post_id, scheduled_at);
        Ok(post)
    }

    /// Next scheduled posts for an account, soonest first.
    pub async fn list_upcoming(&self, instagram_account_id: Uuid, limit: i64) -> Result<Vec<Post>> {
        let posts = post_repo::find_upcoming_scheduled(
            &self.db,
            instagram_account_id,
            limit.clamp(1, 100),
        )
        .await?;

        Ok(posts)
    }

    /// Calendar view: posts scheduled inside a time window.
    pub async fn list_in_range(
        &self,
        instagram_account_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Post>> {
        if to < from {
            return Err(AppError::BadRequest(
                "Range end must not precede range start".to_string(),
            ));
        }

        let posts = post_repo::list_posts_in_range(&self.db, instagram_account_id, from, to).await?;
        Ok(posts)
    }

    /// Makes a post publishable right now: schedules draft/failed posts for
    /// the current instant, pulls scheduled ones forward. The caller then
    /// drives the orchestrator; no task is registered for the past-due time.
    pub async fn make_due_now(&self, post_id: Uuid) -> Result<Post> {
        let post = self.get_post(post_id).await?;
        let now = Utc::now();

        match post.status {
            PostStatus::Draft | PostStatus::Failed => {
                PublishContent::from_post(&post)?;
                post_repo::schedule_post(&self.db, post_id, now).await?
            }
            PostStatus::Scheduled => {
                if let Err(e) = self.scheduler.cancel_publish(post_id).await {
                    warn!("Could not cancel publish task for post {}: {}", post_id, e);
                }
                post_repo::reschedule_post(&self.db, post_id, now).await?
            }
            other => {
                return Err(AppError::Validation(format!(
                    "Post {} cannot be published now, it is {}",
                    post_id,
                    other.as_str()
                )));
            }
        }
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Post {} changed state before it could be made due",
                post_id
            ))
        })
    }

    /// Takes a scheduled post back to draft, cancelling its trigger.
    pub async fn cancel_schedule(&self, post_id: Uuid) -> Result<Post> {
        let post = self.get_post(post_id).await?;
        if post.status != PostStatus::Scheduled {
            return Err(AppError::Validation(format!(
                "Post {} is not scheduled, it is {}",
                post_id,
                post.status.as_str()
            )));
        }

        if let Err(e) = self.scheduler.cancel_publish(post_id).await {
            warn!("Could not cancel publish task for post {}: {}", post_id, e);
        }

        let post = post_repo::unschedule_post(&self.db, post_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Post {} changed state before the schedule could be cancelled",
                    post_id
                ))
            })?;

        info!("Cancelled schedule for post {}", post_id);
        Ok(post)
    }
}

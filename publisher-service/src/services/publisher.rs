use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::db::{account_repo, post_repo};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Post, PostStatus};
use crate::services::instagram::{InstagramClient, PublishContent};

const STALE_CLAIM_MESSAGE: &str = "Publishing attempt was interrupted and timed out";

/// What a publish trigger amounted to.
#[derive(Debug)]
pub enum PublishOutcome {
    Published(Post),
    /// The claim was lost, another trigger already owns or finished the post.
    Skipped(PostStatus),
    Failed(String),
}

/// Outcome summary of one reconciliation sweep.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub posts_checked: usize,
    pub posts_published: usize,
    pub posts_failed: usize,
    pub stale_claims_failed: usize,
    pub details: Vec<SweepDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepDetail {
    pub post_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drives a post from SCHEDULED to a terminal state. All triggers funnel
/// through `publish_post`, so the task callback, the sweep, and any manual
/// retry share one code path.
pub struct PublisherService {
    db: PgPool,
    instagram: Arc<InstagramClient>,
    sweep: SweepConfig,
}

impl PublisherService {
    pub fn new(db: PgPool, instagram: Arc<InstagramClient>, sweep: SweepConfig) -> Self {
        Self {
            db,
            instagram,
            sweep,
        }
    }

    /// Publishes one post. The claim makes this idempotent: duplicate
    /// triggers for the same post find a non-SCHEDULED row and skip.
    pub async fn publish_post(&self, post_id: Uuid) -> Result<PublishOutcome> {
        let post = match post_repo::claim_for_publishing(&self.db, post_id).await? {
            Some(post) => post,
            None => {
                return match post_repo::find_post_by_id(&self.db, post_id).await? {
                    Some(existing) => {
                        info!(
                            "Post {} is {}, nothing to publish",
                            post_id,
                            existing.status.as_str()
                        );
                        Ok(PublishOutcome::Skipped(existing.status))
                    }
                    None => Err(AppError::NotFound(format!("Post {} does not exist", post_id))),
                };
            }
        };

        info!("Claimed post {} for publishing", post.id);

        match self.run_publish_protocol(&post).await {
            Ok(media_id) => {
                metrics::observe_publish_success(post.content_type.as_str());
                match post_repo::mark_published(&self.db, post.id, &media_id).await? {
                    Some(updated) => {
                        info!("Post {} published as media {}", updated.id, media_id);
                        Ok(PublishOutcome::Published(updated))
                    }
                    None => {
                        warn!(
                            "Post {} vanished after publishing media {}",
                            post.id, media_id
                        );
                        Ok(PublishOutcome::Published(post))
                    }
                }
            }
            Err(e) => {
                let message = e.to_string();
                metrics::observe_publish_failure(post.content_type.as_str());
                error!("Publishing post {} failed: {}", post.id, message);
                post_repo::mark_failed(&self.db, post.id, &message).await?;
                Ok(PublishOutcome::Failed(message))
            }
        }
    }

    /// Everything between a successful claim and the terminal transition.
    /// Any error here fails the post with the error as its message.
    async fn run_publish_protocol(&self, post: &Post) -> Result<String> {
        let account = account_repo::find_active_account(&self.db, post.instagram_account_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "No active Instagram account {} for post {}",
                    post.instagram_account_id, post.id
                ))
            })?;

        let content = PublishContent::from_post(post)?;
        let caption = post.composed_caption();

        self.instagram
            .publish(&account, &content, caption.as_deref())
            .await
    }

    /// Safety-net sweep: recovers stale claims, then publishes every due
    /// scheduled post. One bad post never stops the rest of the batch.
    pub async fn check_scheduled_posts(&self) -> Result<SweepReport> {
        metrics::observe_sweep_run();
        let started = std::time::Instant::now();

        let cutoff = Utc::now() - Duration::minutes(self.sweep.stale_claim_minutes);
        let stale = post_repo::fail_stale_publishing(&self.db, cutoff, STALE_CLAIM_MESSAGE).await?;
        if !stale.is_empty() {
            warn!("Failed {} stale publishing claim(s): {:?}", stale.len(), stale);
        }

        let due = post_repo::find_due_scheduled(&self.db, Utc::now(), self.sweep.batch_limit).await?;
        let mut report = SweepReport {
            posts_checked: due.len(),
            posts_published: 0,
            posts_failed: 0,
            stale_claims_failed: stale.len(),
            details: Vec::new(),
        };

        for post in due {
            match self.publish_post(post.id).await {
                Ok(PublishOutcome::Published(_)) => {
                    report.posts_published += 1;
                    report.details.push(SweepDetail {
                        post_id: post.id,
                        status: "published".to_string(),
                        error: None,
                    });
                }
                Ok(PublishOutcome::Skipped(status)) => {
                    debug!(
                        "Post {} was already {} when the sweep reached it",
                        post.id,
                        status.as_str()
                    );
                    report.details.push(SweepDetail {
                        post_id: post.id,
                        status: "skipped".to_string(),
                        error: None,
                    });
                }
                Ok(PublishOutcome::Failed(message)) => {
                    report.posts_failed += 1;
                    report.details.push(SweepDetail {
                        post_id: post.id,
                        status: "failed".to_string(),
                        error: Some(message),
                    });
                }
                Err(e) => {
                    report.posts_failed += 1;
                    error!("Sweep could not process post {}: {}", post.id, e);
                    report.details.push(SweepDetail {
                        post_id: post.id,
                        status: "failed".to_string(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        metrics::observe_sweep_duration(started.elapsed());
        info!(
            "Sweep finished: {} checked, {} published, {} failed",
            report.posts_checked, report.posts_published, report.posts_failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_report_serializes_camel_case() {
        let report = SweepReport {
            posts_checked: 3,
            posts_published: 1,
            posts_failed: 1,
            stale_claims_failed: 0,
            details: vec![SweepDetail {
                post_id: Uuid::new_v4(),
                status: "failed".to_string(),
                error: Some("Container creation returned 400".to_string()),
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["postsChecked"], 3);
        assert_eq!(json["postsPublished"], 1);
        assert_eq!(json["postsFailed"], 1);
        assert_eq!(json["staleClaimsFailed"], 0);
        assert_eq!(json["details"][0]["status"], "failed");
        assert!(json["details"][0]["error"].is_string());
    }

    #[test]
    fn test_sweep_detail_omits_absent_error() {
        let detail = SweepDetail {
            post_id: Uuid::new_v4(),
            status: "published".to_string(),
            error: None,
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("error").is_none());
    }
}

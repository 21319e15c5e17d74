use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::services::publisher::{PublishOutcome, PublisherService, SweepReport};

/// Bookkeeping across sweep invocations, shared by the status endpoint.
pub struct SchedulerState {
    run_count: AtomicU64,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            run_count: AtomicU64::new(0),
            last_run: Mutex::new(None),
        }
    }

    pub fn record_run(&self) -> u64 {
        let mut last_run = self.last_run.lock().unwrap_or_else(|e| e.into_inner());
        *last_run = Some(Utc::now());
        self.run_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn snapshot(&self) -> (u64, Option<DateTime<Utc>>) {
        let last_run = *self.last_run.lock().unwrap_or_else(|e| e.into_inner());
        (self.run_count.load(Ordering::SeqCst), last_run)
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepRunResponse {
    success: bool,
    message: String,
    data: SweepReport,
    timestamp: DateTime<Utc>,
    run_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SchedulerStatusResponse {
    status: &'static str,
    last_run: Option<DateTime<Utc>>,
    run_count: u64,
    current_time: DateTime<Utc>,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishCallbackResponse {
    post_id: Uuid,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run one reconciliation sweep over due scheduled posts
///
/// POST /scheduler/check-scheduled-posts
///
/// Cloud Scheduler (or an operator) calls this; it is safe to invoke at any
/// frequency because publishing is claim-guarded per post.
pub async fn check_scheduled_posts(
    publisher: web::Data<Arc<PublisherService>>,
    state: web::Data<Arc<SchedulerState>>,
) -> Result<HttpResponse> {
    let run_count = state.record_run();
    let report = publisher.check_scheduled_posts().await?;

    Ok(HttpResponse::Ok().json(SweepRunResponse {
        success: true,
        message: "Scheduled posts checked successfully".to_string(),
        data: report,
        timestamp: Utc::now(),
        run_count,
    }))
}

/// Scheduler status for dashboards
///
/// GET /scheduler/status
pub async fn scheduler_status(state: web::Data<Arc<SchedulerState>>) -> HttpResponse {
    let (run_count, last_run) = state.snapshot();

    HttpResponse::Ok().json(SchedulerStatusResponse {
        status: "running",
        last_run,
        run_count,
        current_time: Utc::now(),
        message: "Sweeps are triggered externally, lastRun is the most recent one",
    })
}

/// Liveness probe for the external trigger
///
/// POST /scheduler/health
pub async fn scheduler_health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// Delayed-task callback that publishes a single post
///
/// POST /scheduler/publish-post/{post_id}
///
/// Always acknowledges with 200 so the task queue never redelivers. A post
/// the callback could not publish is either already terminal on its row or
/// still SCHEDULED, and the sweep will retry it.
pub async fn publish_post_callback(
    publisher: web::Data<Arc<PublisherService>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let post_id = path.into_inner();

    let response = match publisher.publish_post(post_id).await {
        Ok(PublishOutcome::Published(_)) => PublishCallbackResponse {
            post_id,
            outcome: "published",
            error: None,
        },
        Ok(PublishOutcome::Skipped(_)) => PublishCallbackResponse {
            post_id,
            outcome: "skipped",
            error: None,
        },
        Ok(PublishOutcome::Failed(message)) => PublishCallbackResponse {
            post_id,
            outcome: "failed",
            error: Some(message),
        },
        Err(AppError::NotFound(message)) => {
            warn!("Publish task fired for missing post {}", post_id);
            PublishCallbackResponse {
                post_id,
                outcome: "missing",
                error: Some(message),
            }
        }
        Err(e) => {
            error!("Publish callback for post {} errored: {}", post_id, e);
            PublishCallbackResponse {
                post_id,
                outcome: "error",
                error: Some(e.to_string()),
            }
        }
    };

    HttpResponse::Ok().json(response)
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/scheduler")
            .route("/check-scheduled-posts", web::post().to(check_scheduled_posts))
            .route("/status", web::get().to(scheduler_status))
            .route("/health", web::post().to(scheduler_health))
            .route("/publish-post/{post_id}", web::post().to(publish_post_callback)),
    );
}

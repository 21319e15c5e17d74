use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::handlers::ApiResponse;
use crate::models::{CreatePostRequest, PostStatus, SchedulePostRequest, UpdatePostRequest};
use crate::services::posts::PostService;
use crate::services::publisher::{PublishOutcome, PublisherService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    pub instagram_account_id: Uuid,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingQuery {
    pub instagram_account_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub instagram_account_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Create a new post as a draft
///
/// POST /api/v1/posts
pub async fn create_post(
    service: web::Data<Arc<PostService>>,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let post = service.create_post(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// Get post by ID
///
/// GET /api/v1/posts/{id}
pub async fn get_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// List posts for an account, newest first
///
/// GET /api/v1/posts?instagramAccountId=...&status=...
pub async fn list_posts(
    service: web::Data<Arc<PostService>>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(PostStatus::from_str(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown post status filter: {}", raw))
        })?),
        None => None,
    };

    let posts = service
        .list_posts(
            query.instagram_account_id,
            status,
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// Next scheduled posts for an account, soonest first
///
/// GET /api/v1/posts/upcoming?instagramAccountId=...&limit=...
pub async fn upcoming_posts(
    service: web::Data<Arc<PostService>>,
    query: web::Query<UpcomingQuery>,
) -> Result<HttpResponse> {
    let posts = service
        .list_upcoming(query.instagram_account_id, query.limit.unwrap_or(10))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// Posts scheduled inside a time window, calendar order
///
/// GET /api/v1/posts/range?instagramAccountId=...&from=...&to=...
pub async fn posts_in_range(
    service: web::Data<Arc<PostService>>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse> {
    let posts = service
        .list_in_range(query.instagram_account_id, query.from, query.to)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// Edit a draft post
///
/// PUT /api/v1/posts/{id}
pub async fn update_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    let post = service
        .update_post(path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Delete a post
///
/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.delete_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

/// Put a draft or failed post on the schedule
///
/// POST /api/v1/posts/{id}/schedule
pub async fn schedule_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
    req: web::Json<SchedulePostRequest>,
) -> Result<HttpResponse> {
    let post = service
        .schedule_post(path.into_inner(), req.scheduled_at)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Move a scheduled post to a new fire time
///
/// PUT /api/v1/posts/{id}/schedule
pub async fn reschedule_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
    req: web::Json<SchedulePostRequest>,
) -> Result<HttpResponse> {
    let post = service
        .reschedule_post(path.into_inner(), req.scheduled_at)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Publish a post immediately, skipping the queue
///
/// POST /api/v1/posts/{id}/publish-now
pub async fn publish_now(
    service: web::Data<Arc<PostService>>,
    publisher: web::Data<Arc<PublisherService>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    service.make_due_now(post_id).await?;

    match publisher.publish_post(post_id).await? {
        PublishOutcome::Published(post) => Ok(HttpResponse::Ok().json(ApiResponse::ok(post))),
        PublishOutcome::Skipped(status) => Err(AppError::Validation(format!(
            "Post {} was picked up by another trigger and is now {}",
            post_id,
            status.as_str()
        ))),
        PublishOutcome::Failed(message) => Err(AppError::InstagramApi(message)),
    }
}

/// Take a scheduled post off the schedule
///
/// DELETE /api/v1/posts/{id}/schedule
pub async fn cancel_schedule(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.cancel_schedule(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/posts")
            .route("", web::post().to(create_post))
            .route("", web::get().to(list_posts))
            .route("/upcoming", web::get().to(upcoming_posts))
            .route("/range", web::get().to(posts_in_range))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::put().to(update_post))
            .route("/{id}", web::delete().to(delete_post))
            .route("/{id}/schedule", web::post().to(schedule_post))
            .route("/{id}/schedule", web::put().to(reschedule_post))
            .route("/{id}/schedule", web::delete().to(cancel_schedule))
            .route("/{id}/publish-now", web::post().to(publish_now)),
    );
}

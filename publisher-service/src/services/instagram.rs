use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::InstagramConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{InstagramAccount, Post, PostContentType};

/// Media file extensions treated as video when classifying a URL.
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "webm"];

pub fn is_video_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('.').next() {
        Some(ext) => VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// One entry of a carousel, typed by how the Graph API wants it created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselChild {
    Image { image_url: String },
    Video { video_url: String },
}

/// What gets pushed to the platform, derived from a post's content type and
/// media URLs. Building this is pure validation, no network involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishContent {
    Image {
        image_url: String,
    },
    Video {
        video_url: String,
    },
    Carousel {
        children: Vec<CarouselChild>,
    },
    Reel {
        video_url: String,
    },
    Story {
        media_url: String,
        is_video: bool,
    },
}

impl PublishContent {
    pub fn from_post(post: &Post) -> Result<Self> {
        let first = post
            .media_urls
            .first()
            .ok_or_else(|| AppError::Validation("Post has no media attached".to_string()))?;

        match post.content_type {
            PostContentType::Image => Ok(Self::Image {
                image_url: first.clone(),
            }),
            PostContentType::Video => Ok(Self::Video {
                video_url: first.clone(),
            }),
            PostContentType::Reel => Ok(Self::Reel {
                video_url: first.clone(),
            }),
            PostContentType::Story => Ok(Self::Story {
                media_url: first.clone(),
                is_video: is_video_url(first),
            }),
            PostContentType::Carousel => {
                if post.media_urls.len() < 2 || post.media_urls.len() > 10 {
                    return Err(AppError::Validation(
                        "Carousel posts need between 2 and 10 media items".to_string(),
                    ));
                }
                let children = post
                    .media_urls
                    .iter()
                    .map(|url| {
                        if is_video_url(url) {
                            CarouselChild::Video {
                                video_url: url.clone(),
                            }
                        } else {
                            CarouselChild::Image {
                                image_url: url.clone(),
                            }
                        }
                    })
                    .collect();
                Ok(Self::Carousel { children })
            }
        }
    }
}

#[derive(Deserialize)]
struct MediaContainerResponse {
    id: String,
}

#[derive(Deserialize)]
struct ContainerStatusResponse {
    status_code: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct PublishResponse {
    id: String,
}

/// Client for the three-step Graph API publish protocol: create media
/// containers, poll the to-be-committed container until the platform has
/// processed it, then commit.
pub struct InstagramClient {
    http: reqwest::Client,
    api_base: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl InstagramClient {
    pub fn new(http: reqwest::Client, config: &InstagramConfig) -> Self {
        Self {
            http,
            api_base: config.graph_api_base.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Runs the full protocol and returns the platform media id. Nothing is
    /// visible on the platform unless the final commit succeeds.
    pub async fn publish(
        &self,
        account: &InstagramAccount,
        content: &PublishContent,
        caption: Option<&str>,
    ) -> Result<String> {
        let container_id = self.create_container(account, content, caption).await?;
        self.wait_for_container(account, &container_id).await?;
        self.commit_container(account, &container_id).await
    }

    async fn create_container(
        &self,
        account: &InstagramAccount,
        content: &PublishContent,
        caption: Option<&str>,
    ) -> Result<String> {
        match content {
            PublishContent::Image { image_url } => {
                self.create_media_container(account, vec![("image_url", image_url.clone())], caption)
                    .await
            }
            PublishContent::Video { video_url } | PublishContent::Reel { video_url } => {
                let params = vec![
                    ("media_type", "REELS".to_string()),
                    ("video_url", video_url.clone()),
                ];
                self.create_media_container(account, params, caption).await
            }
            PublishContent::Story {
                media_url,
                is_video,
            } => {
                let mut params = vec![("media_type", "STORIES".to_string())];
                if *is_video {
                    params.push(("video_url", media_url.clone()));
                } else {
                    params.push(("image_url", media_url.clone()));
                }
                // Stories carry no caption on the Graph API.
                self.create_media_container(account, params, None).await
            }
            PublishContent::Carousel { children } => {
                let mut child_ids = Vec::with_capacity(children.len());
                for child in children {
                    let params = match child {
                        CarouselChild::Image { image_url } => vec![
                            ("image_url", image_url.clone()),
                            ("is_carousel_item", "true".to_string()),
                        ],
                        CarouselChild::Video { video_url } => vec![
                            ("media_type", "VIDEO".to_string()),
                            ("video_url", video_url.clone()),
                            ("is_carousel_item", "true".to_string()),
                        ],
                    };
                    let child_id = self.create_media_container(account, params, None).await?;
                    child_ids.push(child_id);
                }

                let params = vec![
                    ("media_type", "CAROUSEL".to_string()),
                    ("children", child_ids.join(",")),
                ];
                self.create_media_container(account, params, caption).await
            }
        }
    }

    async fn create_media_container(
        &self,
        account: &InstagramAccount,
        mut params: Vec<(&str, String)>,
        caption: Option<&str>,
    ) -> Result<String> {
        if let Some(caption) = caption {
            params.push(("caption", caption.to_string()));
        }
        params.push(("access_token", account.access_token.clone()));

        let url = format!("{}/{}/media", self.api_base, account.instagram_user_id);
        let response = self
            .http
            .post(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                metrics::observe_graph_api_call("container_create", false);
                AppError::InstagramApi(format!("Container creation request failed: {}", e))
            })?;

        metrics::observe_graph_api_call("container_create", response.status().is_success());
        if !response.status().is_success() {
            return Err(graph_api_error("Container creation", response).await);
        }

        let container: MediaContainerResponse = response.json().await.map_err(|e| {
            AppError::InstagramApi(format!("Invalid container creation response: {}", e))
        })?;

        info!(
            "Created media container {} for account {}",
            container.id, account.username
        );
        Ok(container.id)
    }

    /// Polls the container status a bounded number of times. ERROR is final
    /// and fails right away; transport hiccups burn an attempt and move on.
    async fn wait_for_container(
        &self,
        account: &InstagramAccount,
        container_id: &str,
    ) -> Result<()> {
        for attempt in 1..=self.max_poll_attempts {
            match self.container_status(account, container_id).await {
                Ok(status) => match status.status_code.as_deref() {
                    Some("FINISHED") => {
                        debug!("Container {} ready after {} checks", container_id, attempt);
                        return Ok(());
                    }
                    Some("ERROR") => {
                        let detail = status
                            .status
                            .unwrap_or_else(|| "no detail provided".to_string());
                        return Err(AppError::InstagramApi(format!(
                            "Container {} failed processing: {}",
                            container_id, detail
                        )));
                    }
                    other => {
                        debug!(
                            "Container {} not ready yet (status {:?}, attempt {}/{})",
                            container_id, other, attempt, self.max_poll_attempts
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        "Status check for container {} failed (attempt {}/{}): {}",
                        container_id, attempt, self.max_poll_attempts, e
                    );
                }
            }

            if attempt < self.max_poll_attempts {
                sleep(self.poll_interval).await;
            }
        }

        Err(AppError::ProcessingTimeout(format!(
            "Container {} was not ready after {} status checks",
            container_id, self.max_poll_attempts
        )))
    }

    async fn container_status(
        &self,
        account: &InstagramAccount,
        container_id: &str,
    ) -> Result<ContainerStatusResponse> {
        let url = format!("{}/{}", self.api_base, container_id);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("fields", "status_code,status"),
                ("access_token", account.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                metrics::observe_graph_api_call("status_check", false);
                AppError::InstagramApi(format!("Status request failed: {}", e))
            })?;

        metrics::observe_graph_api_call("status_check", response.status().is_success());
        if !response.status().is_success() {
            return Err(graph_api_error("Status check", response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::InstagramApi(format!("Invalid status response: {}", e)))
    }

    async fn commit_container(
        &self,
        account: &InstagramAccount,
        container_id: &str,
    ) -> Result<String> {
        let url = format!("{}/{}/media_publish", self.api_base, account.instagram_user_id);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("creation_id", container_id),
                ("access_token", account.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                metrics::observe_graph_api_call("media_publish", false);
                AppError::InstagramApi(format!("Publish request failed: {}", e))
            })?;

        metrics::observe_graph_api_call("media_publish", response.status().is_success());
        if !response.status().is_success() {
            return Err(graph_api_error("Publish", response).await);
        }

        let published: PublishResponse = response
            .json()
            .await
            .map_err(|e| AppError::InstagramApi(format!("Invalid publish response: {}", e)))?;

        info!(
            "Published container {} as media {}",
            container_id, published.id
        );
        Ok(published.id)
    }
}

/// Pulls the platform's error message out of a failed response, falling back
/// to the raw body.
async fn graph_api_error(action: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    AppError::InstagramApi(format!("{} returned {}: {}", action, status, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostStatus;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IG_USER_ID: &str = "17841400000000001";

    fn test_account() -> InstagramAccount {
        InstagramAccount {
            id: Uuid::new_v4(),
            username: "brandco".to_string(),
            instagram_user_id: IG_USER_ID.to_string(),
            access_token: "ig-access-token".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_post(content_type: PostContentType, media_urls: Vec<&str>) -> Post {
        Post {
            id: Uuid::new_v4(),
            instagram_account_id: Uuid::new_v4(),
            title: "Launch".to_string(),
            caption: Some("Hello world".to_string()),
            hashtags: None,
            content_type,
            status: PostStatus::Publishing,
            media_urls: media_urls.into_iter().map(String::from).collect(),
            scheduled_at: None,
            published_at: None,
            instagram_post_id: None,
            scheduled_task_ref: None,
            error_message: None,
            claimed_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn client_for(server: &MockServer) -> InstagramClient {
        InstagramClient {
            http: reqwest::Client::new(),
            api_base: server.uri(),
            poll_interval: Duration::from_millis(10),
            max_poll_attempts: 3,
        }
    }

    #[test]
    fn test_video_url_detection() {
        assert!(is_video_url("https://cdn.example.com/clip.mp4"));
        assert!(is_video_url("https://cdn.example.com/clip.MOV"));
        assert!(is_video_url("https://cdn.example.com/clip.webm?token=abc"));
        assert!(!is_video_url("https://cdn.example.com/photo.jpg"));
        assert!(!is_video_url("https://cdn.example.com/download"));
    }

    #[test]
    fn test_content_from_post_validations() {
        let empty = test_post(PostContentType::Image, vec![]);
        assert!(matches!(
            PublishContent::from_post(&empty),
            Err(AppError::Validation(_))
        ));

        let single_carousel = test_post(PostContentType::Carousel, vec!["https://c/a.jpg"]);
        assert!(matches!(
            PublishContent::from_post(&single_carousel),
            Err(AppError::Validation(_))
        ));

        // Single-media types use the first entry only, extras are ignored.
        let video = test_post(
            PostContentType::Video,
            vec!["https://c/clip.mp4", "https://c/extra.jpg"],
        );
        assert_eq!(
            PublishContent::from_post(&video).unwrap(),
            PublishContent::Video {
                video_url: "https://c/clip.mp4".to_string(),
            }
        );

        let story = test_post(PostContentType::Story, vec!["https://c/clip.mp4"]);
        assert_eq!(
            PublishContent::from_post(&story).unwrap(),
            PublishContent::Story {
                media_url: "https://c/clip.mp4".to_string(),
                is_video: true,
            }
        );

        let mixed = test_post(
            PostContentType::Carousel,
            vec!["https://c/a.jpg", "https://c/b.mp4"],
        );
        assert_eq!(
            PublishContent::from_post(&mixed).unwrap(),
            PublishContent::Carousel {
                children: vec![
                    CarouselChild::Image {
                        image_url: "https://c/a.jpg".to_string()
                    },
                    CarouselChild::Video {
                        video_url: "https://c/b.mp4".to_string()
                    },
                ],
            }
        );
    }

    #[tokio::test]
    async fn test_publish_image_happy_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("image_url", "https://cdn.example.com/a.jpg"))
            .and(query_param("caption", "Hello world"))
            .and(query_param("access_token", "ig-access-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "container-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/container-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "FINISHED", "status": "ok" }),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .and(query_param("creation_id", "container-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ig-media-9" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = PublishContent::Image {
            image_url: "https://cdn.example.com/a.jpg".to_string(),
        };
        let media_id = client
            .publish(&test_account(), &content, Some("Hello world"))
            .await
            .unwrap();

        assert_eq!(media_id, "ig-media-9");
    }

    #[tokio::test]
    async fn test_reel_publish_sends_only_the_video_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("media_type", "REELS"))
            .and(query_param("video_url", "https://cdn.example.com/clip.mp4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "reel-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reel-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "FINISHED", "status": "ok" }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ig-reel-3" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let post = test_post(
            PostContentType::Reel,
            vec!["https://cdn.example.com/clip.mp4", "https://cdn.example.com/extra.jpg"],
        );
        let content = PublishContent::from_post(&post).unwrap();
        client
            .publish(&test_account(), &content, Some("Hello world"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        for request in requests {
            let query = request.url.query().unwrap_or("");
            assert!(
                !query.contains("cover_url") && !query.contains("extra.jpg"),
                "reel request leaked a second media ref: {}",
                request.url
            );
        }
    }

    #[tokio::test]
    async fn test_carousel_children_created_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("image_url", "https://cdn.example.com/x.jpg"))
            .and(query_param("is_carousel_item", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "child-x" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("media_type", "VIDEO"))
            .and(query_param("video_url", "https://cdn.example.com/y.mp4"))
            .and(query_param("is_carousel_item", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "child-y" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        // The parent must reference the children in media order.
        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("media_type", "CAROUSEL"))
            .and(query_param("children", "child-x,child-y"))
            .and(query_param("caption", "Hello world"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "parent-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/parent-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "FINISHED", "status": "ok" }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .and(query_param("creation_id", "parent-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ig-media-55" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let post = test_post(
            PostContentType::Carousel,
            vec!["https://cdn.example.com/x.jpg", "https://cdn.example.com/y.mp4"],
        );
        let content = PublishContent::from_post(&post).unwrap();
        let media_id = client
            .publish(&test_account(), &content, Some("Hello world"))
            .await
            .unwrap();

        assert_eq!(media_id, "ig-media-55");
    }

    #[tokio::test]
    async fn test_carousel_child_failure_skips_commit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("image_url", "https://cdn.example.com/bad.jpg"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({ "error": { "message": "Invalid image" } }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("media_type", "CAROUSEL"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = PublishContent::Carousel {
            children: vec![
                CarouselChild::Image {
                    image_url: "https://cdn.example.com/bad.jpg".to_string(),
                },
                CarouselChild::Image {
                    image_url: "https://cdn.example.com/good.jpg".to_string(),
                },
            ],
        };
        let err = client
            .publish(&test_account(), &content, None)
            .await
            .unwrap_err();

        match err {
            AppError::InstagramApi(msg) => assert!(msg.contains("Invalid image")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_story_caption_is_dropped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .and(query_param("media_type", "STORIES"))
            .and(query_param("video_url", "https://cdn.example.com/story.mp4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "story-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/story-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "FINISHED", "status": "ok" }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ig-story-7" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = PublishContent::Story {
            media_url: "https://cdn.example.com/story.mp4".to_string(),
            is_video: true,
        };
        client
            .publish(&test_account(), &content, Some("Hello world"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        for request in requests {
            assert!(
                !request.url.query().unwrap_or("").contains("caption"),
                "story request leaked a caption: {}",
                request.url
            );
        }
    }

    #[tokio::test]
    async fn test_poll_error_status_fails_immediately() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "container-9" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/container-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "ERROR", "status": "Media processing failed" }),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let content = PublishContent::Image {
            image_url: "https://cdn.example.com/a.jpg".to_string(),
        };
        let err = client
            .publish(&test_account(), &content, None)
            .await
            .unwrap_err();

        match err {
            AppError::InstagramApi(msg) => assert!(msg.contains("Media processing failed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_attempts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{}/media", IG_USER_ID)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "container-2" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/container-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status_code": "IN_PROGRESS", "status": "working" }),
            ))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{}/media_publish", IG_USER_ID)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = InstagramClient {
            http: reqwest::Client::new(),
            api_base: server.uri(),
            poll_interval: Duration::from_millis(10),
            max_poll_attempts: 2,
        };
        let content = PublishContent::Image {
            image_url: "https://cdn.example.com/a.jpg".to_string(),
        };
        let err = client
            .publish(&test_account(), &content, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProcessingTimeout(_)));
    }
}

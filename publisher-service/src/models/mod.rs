use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post lifecycle status
///
/// PUBLISHING is the in-flight claim marker: the orchestrator moves a post
/// SCHEDULED -> PUBLISHING with a conditional update before talking to the
/// Graph API, so a concurrent trigger for the same post observes a
/// non-SCHEDULED row and exits without side effects. It is never accepted
/// from API input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "publishing" => Some(Self::Publishing),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal for the pipeline. FAILED posts can be re-scheduled by an
    /// operator, which re-enters the state machine from scratch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }
}

/// Content type of a post, fixed at creation
///
/// Determines which Graph API container variant is built when the post is
/// published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PostContentType {
    Image,
    Video,
    Carousel,
    Reel,
    Story,
}

impl PostContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Carousel => "carousel",
            Self::Reel => "reel",
            Self::Story => "story",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "carousel" => Some(Self::Carousel),
            "reel" => Some(Self::Reel),
            "story" => Some(Self::Story),
            _ => None,
        }
    }
}

/// The unit of schedulable work
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub instagram_account_id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub content_type: PostContentType,
    pub status: PostStatus,
    /// Ordered media URLs; carousel children are created in this order
    pub media_urls: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    /// External post id, set exactly once on a successful commit
    pub instagram_post_id: Option<String>,
    /// Handle of the registered delayed task, best-effort while SCHEDULED
    pub scheduled_task_ref: Option<String>,
    pub error_message: Option<String>,
    /// Set when the publishing claim succeeds; drives stale-claim recovery
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Caption sent to the external platform: caption and hashtags joined
    /// with a blank line, absent parts skipped.
    pub fn composed_caption(&self) -> Option<String> {
        let caption = self.caption.as_deref().unwrap_or("").trim();
        let hashtags = self.hashtags.as_deref().unwrap_or("").trim();

        match (caption.is_empty(), hashtags.is_empty()) {
            (true, true) => None,
            (false, true) => Some(caption.to_string()),
            (true, false) => Some(hashtags.to_string()),
            (false, false) => Some(format!("{}\n\n{}", caption, hashtags)),
        }
    }
}

/// Owning publishing account, read-only from the pipeline's perspective
///
/// Rows are provisioned by the account-linking flow, which lives outside this
/// service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InstagramAccount {
    pub id: Uuid,
    pub username: String,
    /// Graph API user id of the Instagram business account
    pub instagram_user_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub instagram_account_id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub content_type: PostContentType,
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// When present the post is created directly on the schedule.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Partial update, draft posts only. Absent fields keep their value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<String>,
    pub media_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePostRequest {
    pub scheduled_at: DateTime<Utc>,
}

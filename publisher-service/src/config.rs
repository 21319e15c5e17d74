/// Configuration management for the publisher service
///
/// This module handles loading and managing configuration from environment
/// variables.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Instagram Graph API configuration
    pub instagram: InstagramConfig,
    /// Cloud Tasks queue configuration (absent in local development)
    pub cloud_tasks: Option<CloudTasksConfig>,
    /// Reconciliation sweep configuration
    pub sweep: SweepConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Instagram Graph API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Graph API base URL, version segment included
    pub graph_api_base: String,
    /// Interval between container status checks
    pub poll_interval_ms: u64,
    /// Maximum container status checks before giving up
    pub max_poll_attempts: u32,
    /// Per-request timeout for Graph API calls
    pub request_timeout_secs: u64,
}

/// Cloud Tasks queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudTasksConfig {
    pub project_id: String,
    pub location: String,
    pub queue: String,
    /// Public base URL of this service, target of task callbacks
    pub service_base_url: String,
    /// Service account email for the OIDC token attached to callbacks
    pub oidc_service_account: Option<String>,
}

impl CloudTasksConfig {
    /// Load from environment; `None` when the queue is not configured,
    /// in which case the scheduler degrades to the logging no-op.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID").ok()?;
        let service_base_url = std::env::var("SERVICE_BASE_URL").ok()?;

        Some(Self {
            project_id,
            location: std::env::var("CLOUD_TASKS_LOCATION")
                .unwrap_or_else(|_| "us-central1".to_string()),
            queue: std::env::var("CLOUD_TASKS_QUEUE")
                .unwrap_or_else(|_| "post-publishing-queue".to_string()),
            service_base_url,
            oidc_service_account: std::env::var("CLOUD_TASKS_SERVICE_ACCOUNT").ok(),
        })
    }

    /// Fully-qualified queue path used in task names and create calls
    pub fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue
        )
    }
}

/// Reconciliation sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Run the recurring in-process sweep timer. Local development only:
    /// every instance with the timer on runs its own sweep, so multi-instance
    /// deployments must drive the sweep through the HTTP trigger instead.
    pub run_internal_timer: bool,
    /// Interval between internal timer runs
    pub interval_secs: u64,
    /// Max due posts handled per sweep run
    pub batch_limit: i64,
    /// Age after which an in-flight publishing claim is considered abandoned
    pub stale_claim_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("PUBLISHER_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("PUBLISHER_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/postline".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            instagram: InstagramConfig {
                graph_api_base: std::env::var("INSTAGRAM_GRAPH_API_BASE")
                    .unwrap_or_else(|_| "https://graph.facebook.com/v18.0".to_string()),
                poll_interval_ms: std::env::var("INSTAGRAM_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3_000),
                max_poll_attempts: std::env::var("INSTAGRAM_MAX_POLL_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
                request_timeout_secs: std::env::var("INSTAGRAM_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
            cloud_tasks: CloudTasksConfig::from_env(),
            sweep: SweepConfig {
                run_internal_timer: std::env::var("SWEEP_RUN_INTERNAL_TIMER")
                    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
                interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
                batch_limit: std::env::var("SWEEP_BATCH_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
                stale_claim_minutes: std::env::var("SWEEP_STALE_CLAIM_MINUTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(15),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cloud_tasks_config_requires_project_and_url() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("SERVICE_BASE_URL");
        assert!(CloudTasksConfig::from_env().is_none());

        std::env::set_var("GCP_PROJECT_ID", "acme-prod");
        assert!(CloudTasksConfig::from_env().is_none());

        std::env::set_var("SERVICE_BASE_URL", "https://publisher.example.com");
        let cfg = CloudTasksConfig::from_env().expect("config should load");
        assert_eq!(cfg.project_id, "acme-prod");
        assert_eq!(cfg.location, "us-central1");
        assert_eq!(
            cfg.queue_path(),
            "projects/acme-prod/locations/us-central1/queues/post-publishing-queue"
        );

        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("SERVICE_BASE_URL");
    }

    #[test]
    #[serial]
    fn test_sweep_defaults() {
        std::env::remove_var("SWEEP_RUN_INTERNAL_TIMER");
        std::env::remove_var("SWEEP_INTERVAL_SECS");
        std::env::remove_var("SWEEP_BATCH_LIMIT");
        std::env::remove_var("SWEEP_STALE_CLAIM_MINUTES");

        let config = Config::from_env().expect("config should load");
        assert!(!config.sweep.run_internal_timer);
        assert_eq!(config.sweep.interval_secs, 60);
        assert_eq!(config.sweep.batch_limit, 50);
        assert_eq!(config.sweep.stale_claim_minutes, 15);
    }
}

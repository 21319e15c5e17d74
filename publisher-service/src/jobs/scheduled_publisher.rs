//! Local sweep timer
//!
//! Development stand-in for the external trigger. Production deployments
//! call POST /scheduler/check-scheduled-posts from Cloud Scheduler instead
//! and leave this timer disabled.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::handlers::scheduler::SchedulerState;
use crate::services::publisher::PublisherService;

pub async fn start_sweep_timer(
    publisher: Arc<PublisherService>,
    state: Arc<SchedulerState>,
    interval_secs: u64,
) {
    let interval = Duration::from_secs(interval_secs);
    tracing::info!(
        "Starting local sweep timer (interval={}s)",
        interval.as_secs()
    );

    loop {
        sleep(interval).await;

        state.record_run();
        match publisher.check_scheduled_posts().await {
            Ok(report) => {
                if report.posts_checked > 0 || report.stale_claims_failed > 0 {
                    tracing::info!(
                        checked = report.posts_checked,
                        published = report.posts_published,
                        failed = report.posts_failed,
                        stale = report.stale_claims_failed,
                        "Sweep timer cycle completed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Sweep timer cycle failed");
            }
        }
    }
}

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use publisher_service::handlers::{posts as post_handlers, scheduler as scheduler_handlers};
use publisher_service::handlers::scheduler::SchedulerState;
use publisher_service::jobs::scheduled_publisher;
use publisher_service::metrics;
use publisher_service::services::instagram::InstagramClient;
use publisher_service::services::posts::PostService;
use publisher_service::services::publisher::PublisherService;
use publisher_service::services::tasks::build_task_scheduler;
use publisher_service::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn health(db: web::Data<sqlx::PgPool>) -> actix_web::HttpResponse {
    match sqlx::query("SELECT 1").execute(db.get_ref()).await {
        Ok(_) => actix_web::HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "publisher-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => actix_web::HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "publisher-service"
        })),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting publisher service");

    let config = Config::from_env().map_err(anyhow::Error::msg)?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::query("SELECT 1")
        .execute(&db_pool)
        .await
        .context("Database connectivity check failed")?;
    tracing::info!("✅ Connected to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("✅ Database migrations applied");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.instagram.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let instagram = Arc::new(InstagramClient::new(http.clone(), &config.instagram));
    let task_scheduler = build_task_scheduler(&config, http);
    tracing::info!(
        "Task scheduler backend: {} (APP_ENV={})",
        task_scheduler.backend(),
        config.app.env
    );
    let publisher = Arc::new(PublisherService::new(
        db_pool.clone(),
        instagram,
        config.sweep.clone(),
    ));
    let post_service = Arc::new(PostService::new(db_pool.clone(), task_scheduler));
    let scheduler_state = Arc::new(SchedulerState::new());

    if config.sweep.run_internal_timer {
        tokio::spawn(scheduled_publisher::start_sweep_timer(
            publisher.clone(),
            scheduler_state.clone(),
            config.sweep.interval_secs,
        ));
    }

    let addr = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("🚀 HTTP server listening on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(publisher.clone()))
            .app_data(web::Data::new(post_service.clone()))
            .app_data(web::Data::new(scheduler_state.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                post_handlers::register_routes(cfg);
                scheduler_handlers::register_routes(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await?;

    tracing::info!("🛑 Publisher service stopped");
    Ok(())
}

mod api;
mod chat;
mod config;
mod error;
mod feedback;
mod registry;
mod seed;

use warp::Filter;

use chat::MessageLog;
use config::Config;
use feedback::FeedbackBoard;
use registry::SessionRegistry;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let registry = SessionRegistry::new();
    let messages = MessageLog::new();
    let feedback = FeedbackBoard::new();

    if config.seed.demo_data {
        if let Err(e) = seed::seed_demo_data(&registry, &messages, &feedback).await {
            tracing::error!(error = %e, "Failed to seed demo data");
        }
    }

    let routes = api::session_routes::feed_route(registry.clone())
        .or(api::session_routes::session_routes(
            registry.clone(),
            messages.clone(),
        ))
        .or(api::session_routes::message_routes(
            registry.clone(),
            messages,
        ))
        .or(api::session_routes::feedback_routes(
            registry.clone(),
            feedback,
        ))
        .or(api::session_routes::stats_route(registry))
        .or(api::session_routes::health_check())
        .or(api::session_routes::config_endpoint());

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "MockMate server listening"
    );

    warp::serve(routes)
        .run(config.bind_address())
        .await;
}

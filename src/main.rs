use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atlas::config::Config;
use atlas::db;
use atlas::handlers::{auth, chat, health, readiness};
use atlas::middleware::CsrfPolicy;
use atlas::migrations::run_migrations;
use atlas::realtime::Hub;
use atlas::repositories::{
    AlertRepository, ChatRepository, CheckinRepository, ClientRepository, SessionRepository,
    UserRepository,
};
use atlas::routes;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlas=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing::info!(version = %atlas::version::long_version(), "Starting atlas");
    tracing::info!("Connecting to database: {}", config.database_url);

    let pool = db::create_pool(&config.database_url)?;
    run_migrations(&pool)?;

    // Create repositories
    let user_repo = UserRepository::new(pool.clone());
    let session_repo = SessionRepository::new(pool.clone());
    let client_repo = ClientRepository::new(pool.clone());
    let checkin_repo = CheckinRepository::new(pool.clone());
    let alert_repo = AlertRepository::new(pool.clone());
    let chat_repo = ChatRepository::new(pool.clone());

    spawn_session_cleanup(session_repo.clone());

    // Create handler states
    let health_state = health::HealthState { pool: pool.clone() };
    let auth_state = auth::AuthState {
        user_repo: user_repo.clone(),
        session_repo: session_repo.clone(),
        secure_cookies: config.secure_cookies,
    };
    let readiness_state = readiness::ReadinessState {
        client_repo,
        checkin_repo,
        alert_repo,
    };
    let chat_state = chat::ChatState {
        chat_repo,
        user_repo,
        hub: Hub::new(),
    };
    let csrf_policy = Arc::new(CsrfPolicy::new(
        config.allowed_origins.clone(),
        config.csrf_exclude_paths.clone(),
    ));

    let app = routes::create_router(
        health_state,
        auth_state,
        readiness_state,
        chat_state,
        session_repo,
        csrf_policy,
    );

    let addr = config.server_addr();
    tracing::info!("Starting server at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_session_cleanup(session_repo: SessionRepository) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match session_repo.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired sessions purged"),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

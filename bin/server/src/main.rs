use nodeflow_server::{
    api::{self, AppState},
    config::ServerConfig,
    db::PgExecutionStore,
};
use nodeflow_workflow::{
    ActiveWorkflowIndex, BroadcastEventSink, ExecutionCoordinator, ExecutionStore,
    SimulatedExecutor, WorkflowService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let store: Arc<dyn ExecutionStore> = Arc::new(PgExecutionStore::new(db_pool));
    let events = BroadcastEventSink::new(config.event_buffer.max(1));

    let index = Arc::new(ActiveWorkflowIndex::new());
    if let Err(report) = index.load(store.as_ref()).await {
        tracing::warn!(
            error = %report.current_context(),
            "Failed to load active workflows on startup"
        );
    }

    let coordinator = ExecutionCoordinator::new(
        Arc::clone(&store),
        Arc::new(events.clone()),
        Arc::new(SimulatedExecutor::new()),
    );
    let service = WorkflowService::new(store, index, coordinator);
    let app_state = Arc::new(AppState::new(service, events));

    let app = api::app(app_state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

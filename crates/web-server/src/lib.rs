use axum::{extract::DefaultBodyLimit, routing::get, Router};
use configuration::{EnrollmentSettings, Settings, StorageBackend};
use database::{AcademicStore, DbRepository, InMemoryRepository};
use enrollment::{EnrollmentManager, EnrollmentQueryService};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AcademicStore>,
    pub enrollments: EnrollmentManager,
    pub queries: EnrollmentQueryService,
}

impl AppState {
    /// Wires the enrollment services to a single store.
    pub fn new<S>(store: Arc<S>, settings: &EnrollmentSettings) -> Self
    where
        S: AcademicStore + 'static,
    {
        Self {
            enrollments: EnrollmentManager::new(store.clone(), settings),
            queries: EnrollmentQueryService::new(store.clone()),
            store,
        }
    }
}

/// Builds the application's routes on top of the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/enrollments/:id",
            get(handlers::get_enrollment).delete(handlers::delete_enrollment),
        )
        .route(
            "/enrollments/student/:student_id/period/:period",
            get(handlers::get_student_period_enrollments),
        )
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route("/students/:id", get(handlers::get_student))
        .route(
            "/students/:id/enrollments",
            get(handlers::get_student_enrollments),
        )
        .route(
            "/subjects",
            get(handlers::list_subjects).post(handlers::create_subject),
        )
        .route(
            "/subjects/by-degree/:degree_id",
            get(handlers::list_subjects_by_degree),
        )
        .route("/subjects/:id", get(handlers::get_subject))
        .route(
            "/subjects/:id/availability",
            get(handlers::get_subject_availability),
        )
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        // Request bodies are small JSON documents.
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Connects the configured store and serves the API until Ctrl+C.
///
/// Tracing must already be initialized by the caller.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let state = match settings.storage.backend {
        StorageBackend::Postgres => {
            let db_pool = database::connect(&settings.database).await?;
            database::run_migrations(&db_pool).await?;
            AppState::new(Arc::new(DbRepository::new(db_pool)), &settings.enrollment)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; all data is lost on shutdown.");
            AppState::new(Arc::new(InMemoryRepository::new()), &settings.enrollment)
        }
    };

    let addr = settings.server.socket_addr()?;
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}

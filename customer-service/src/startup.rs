use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::{CustomerConfig, MongoConfig};
use crate::handlers;
use crate::services::{
    CustomerRepository, InMemoryCustomerRepository, LedgerService, MongoCustomerRepository,
};
use crate::workers::{DailyScheduler, RolloverJob};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn CustomerRepository>,
    pub ledger: LedgerService,
    pub rollover: RolloverJob,
}

impl AppState {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self {
            ledger: LedgerService::new(repository.clone()),
            rollover: RolloverJob::new(repository.clone()),
            repository,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/customers/stats/summary", get(handlers::customers::customer_stats))
        .route(
            "/customers/payments/mark-all-paid",
            patch(handlers::payments::mark_all_paid),
        )
        .route(
            "/customers/payments/rollover",
            post(handlers::payments::run_rollover),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/customers/:id/ledger/:month",
            get(handlers::customers::customer_balance),
        )
        .route(
            "/customers/:id/monthly-payment",
            post(handlers::payments::initialize_month),
        )
        .route(
            "/customers/:id/payment",
            patch(handlers::payments::record_payment),
        )
        .route(
            "/customers/:id/partial-payment",
            post(handlers::payments::record_partial_payment),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// MongoDB when configured and reachable, otherwise the in-memory store. When the
/// config marks MongoDB as required, failing to reach it is fatal instead.
pub async fn connect_repository(
    config: &MongoConfig,
) -> Result<Arc<dyn CustomerRepository>, AppError> {
    let Some(uri) = config.uri.as_deref() else {
        tracing::warn!("MONGODB_URI not set; using in-memory customer store");
        return Ok(Arc::new(InMemoryCustomerRepository::new()));
    };

    match MongoCustomerRepository::connect(uri, &config.database, config.server_selection_timeout())
        .await
    {
        Ok(repository) => Ok(Arc::new(repository)),
        Err(e) if config.required => {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            Err(e)
        }
        Err(e) => {
            tracing::warn!(error = %e, "MongoDB unreachable; falling back to in-memory customer store");
            Ok(Arc::new(InMemoryCustomerRepository::new()))
        }
    }
}

pub struct Application {
    port: u16,
    router: Router,
    scheduler: Option<DailyScheduler>,
}

impl Application {
    pub async fn build(config: CustomerConfig) -> Result<Self, AppError> {
        let repository = connect_repository(&config.mongodb).await?;
        tracing::info!(store = repository.backend(), "Customer store ready");

        let state = AppState::new(repository);
        let scheduler = if config.scheduler.enabled {
            Some(DailyScheduler::new(
                state.rollover.clone(),
                config.scheduler.run_at,
            ))
        } else {
            tracing::info!("Rollover scheduler disabled by configuration");
            None
        };

        Ok(Self {
            port: config.common.port,
            router: build_router(state),
            scheduler,
        })
    }

    pub async fn run_until_stopped(mut self) -> Result<(), AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            e
        })?;
        tracing::info!("Listening on {}", addr);

        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.start();
        }

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }

        served?;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

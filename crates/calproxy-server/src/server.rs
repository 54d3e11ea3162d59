//! Router assembly and the serve loop.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::{AuthRoutes, EventRoutes};
use crate::signals::shutdown_signal;
use crate::state::SharedState;

/// Builds the application router.
///
/// The callback route is only mounted when the state carries a
/// callback code source.
pub fn build_router(state: SharedState) -> Router {
    let mut router = EventRoutes::routes(state.clone());

    if let Some(callback) = &state.callback {
        router = router.merge(AuthRoutes::routes(callback.clone()));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until SIGTERM/SIGINT.
pub async fn run(config: &ServerConfig, state: SharedState) -> ServerResult<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))?;

    info!(
        %addr,
        auth_mode = %config.auth_mode,
        calendar = %config.calendar_id,
        "calproxy listening"
    );

    serve(listener, state, shutdown_signal()).await
}

/// Serves on `listener` until `shutdown` completes, then drains connections.
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("calproxy stopped");
    Ok(())
}

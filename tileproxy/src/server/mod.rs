//! HTTP tile endpoint.
//!
//! Routes:
//!
//! | Route                                | Description                      |
//! |--------------------------------------|----------------------------------|
//! | `GET /{provider}/xyz/{z}/{x}/{y}.png` | tile, row 0 at the north edge    |
//! | `GET /{provider}/tms/{z}/{x}/{y}.png` | tile, row 0 at the south edge    |
//! | `GET /metrics`                       | JSON timing snapshot             |
//! | `GET /health`                        | liveness and provider list       |

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{parse_tile_path, HealthResponse, Scheme, TILE_CONTENT_TYPE};

use std::io;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::TileService;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    service: Arc<TileService>,
}

/// Builds the router over `service`.
pub fn router(service: Arc<TileService>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .route("/:provider/xyz/:z/:x/:file", get(handlers::xyz_tile))
        .route("/:provider/tms/:z/:x/:file", get(handlers::tms_tile))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { service })
}

/// Serves requests on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    service: Arc<TileService>,
    shutdown: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Tile server listening");
    }

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

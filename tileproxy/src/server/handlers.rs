//! Request handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use super::error::ApiError;
use super::ServerState;
use crate::coord::{flip_y, Tile};
use crate::telemetry::TelemetrySnapshot;

/// Content type of every tile response.
pub const TILE_CONTENT_TYPE: &str = "image/png";

/// Row convention of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Xyz,
    Tms,
}

/// Parses path segments into an XYZ tile.
///
/// `file` is the last segment, `{y}.png`. TMS rows are flipped; rows outside
/// the pyramid are passed through so the pipeline can reject them.
pub fn parse_tile_path(
    provider: &str,
    z: &str,
    x: &str,
    file: &str,
    scheme: Scheme,
) -> Result<Tile, ApiError> {
    let z: u8 = z
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("error in zoom: {}", z)))?;
    let x: u32 = x
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("error in x axis: {}", x)))?;
    let y: u32 = file
        .strip_suffix(".png")
        .unwrap_or(file)
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("error in y axis: {}", file)))?;

    let mut tile = Tile::new(provider, z, x, y);
    if scheme == Scheme::Tms && tile.validate().is_ok() {
        tile.y = flip_y(y, z);
    }
    Ok(tile)
}

pub async fn xyz_tile(
    State(state): State<ServerState>,
    Path((provider, z, x, file)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let tile = parse_tile_path(&provider, &z, &x, &file, Scheme::Xyz)?;
    serve_tile(&state, &tile).await
}

pub async fn tms_tile(
    State(state): State<ServerState>,
    Path((provider, z, x, file)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let tile = parse_tile_path(&provider, &z, &x, &file, Scheme::Tms)?;
    serve_tile(&state, &tile).await
}

async fn serve_tile(state: &ServerState, tile: &Tile) -> Result<Response, ApiError> {
    let body = state.service.fetch_tile(tile).await?;
    let len = body.len_hint();

    let mut response = Body::from_stream(ReaderStream::new(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(TILE_CONTENT_TYPE),
    );
    if let Some(len) = len {
        headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(len));
    }
    Ok(response)
}

/// GET /metrics
pub async fn metrics(State(state): State<ServerState>) -> Json<TelemetrySnapshot> {
    Json(state.service.measurements().snapshot())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    providers: Vec<String>,
    cache_active: bool,
}

/// GET /health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        providers: state.service.registry().names(),
        cache_active: state.service.cache().is_active(),
    })
}

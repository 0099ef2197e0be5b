//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::net::TcpListener;

use tileproxy::cache::TileCache;
use tileproxy::coord::{flip_y, Tile};

#[derive(Clone, Default)]
struct UpstreamState {
    requests: Arc<Mutex<Vec<String>>>,
    hits: Arc<AtomicUsize>,
}

/// A local tile server answering `tile:{path}` for every path except those
/// starting with `/missing`.
pub struct Upstream {
    pub base_url: String,
    state: UpstreamState,
}

impl Upstream {
    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Request paths (with query) seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().clone()
    }
}

async fn answer(State(state): State<UpstreamState>, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let path_and_query = uri
        .path_and_query()
        .map(|p| p.to_string())
        .unwrap_or_default();
    state.requests.lock().push(path_and_query);

    if uri.path().starts_with("/missing") {
        return (StatusCode::NOT_FOUND, "no such tile").into_response();
    }
    ([("content-type", "image/png")], format!("tile:{}", uri.path())).into_response()
}

/// Starts the fake upstream on an ephemeral port.
pub async fn spawn_upstream() -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = UpstreamState::default();
    let router = Router::new().fallback(answer).with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Upstream {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Writes an MBTiles file. Tiles are given in XYZ rows and stored flipped.
///
/// Mirrors `provider::archive::tests::create_mbtiles`, which is not visible
/// from integration tests; keep the schemas identical.
pub fn create_mbtiles(path: &Path, metadata: &[(&str, &str)], tiles: &[(u8, u32, u32, &[u8])]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE metadata (name TEXT, value TEXT);
         CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
         CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);",
    )
    .unwrap();
    for (name, value) in metadata {
        conn.execute(
            "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
            (name, value),
        )
        .unwrap();
    }
    for (z, x, y, data) in tiles {
        conn.execute(
            "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
            (*z as i64, *x as i64, flip_y(*y, *z) as i64, data.to_vec()),
        )
        .unwrap();
    }
}

/// Polls until `tile` is cached or a second has passed.
pub async fn wait_cached(cache: &TileCache, tile: &Tile) -> bool {
    for _ in 0..100 {
        if cache.has(tile).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

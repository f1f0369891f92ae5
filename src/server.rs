use crate::classify::markers_for_mode;
use crate::config::AppConfig;
use crate::data::Dataset;
use crate::render::{build_canvas, render_page};
use crate::types::{BoundaryFeature, MarkerSpec, RenderMode};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geo::algorithm::contains::Contains;
use geo::bounding_rect::BoundingRect;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

// Wrapper for RTree indexing
pub struct DistrictIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for DistrictIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub dataset: Arc<Dataset>,
    pub tree: RTree<DistrictIndex>,
    export_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Arc<Dataset>) -> Self {
        let tree = build_index(&dataset.boundaries);
        Self {
            config,
            dataset,
            tree,
            export_lock: Mutex::new(()),
        }
    }

    /// Name of the district containing the point, if any.
    pub fn district_at(&self, lat: f64, lon: f64) -> Option<&str> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.dataset.boundaries.get(candidate.index))
            .find(|district| district.geometry.contains(&point))
            .map(|district| district.name.as_str())
    }
}

fn build_index(boundaries: &[BoundaryFeature]) -> RTree<DistrictIndex> {
    let items: Vec<DistrictIndex> = boundaries
        .iter()
        .enumerate()
        .filter_map(|(i, district)| {
            let rect = district.geometry.bounding_rect()?;
            Some(DistrictIndex {
                index: i,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    RTree::bulk_load(items)
}

#[derive(Deserialize, Default)]
pub struct ModeParams {
    #[serde(default)]
    mode: RenderMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClickedPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct InteractionReport {
    pub last_clicked: ClickedPoint,
    pub district: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/export", get(export_handler))
        .route("/api/markers", get(markers_handler))
        .route("/api/interaction", post(interaction_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Arc<Dataset>) -> Result<()> {
    info!("Building district index for {} boundaries...", dataset.boundaries.len());
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, dataset));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModeParams>,
) -> Response {
    debug!("Rendering page in {:?} mode", params.mode);
    let canvas = build_canvas(&state.config.map, &state.dataset, params.mode);
    match render_page(&canvas, params.mode) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render page: {:#}", e);
            let message = format!("Failed to render map: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModeParams>,
) -> Response {
    let path = &state.config.output.export_path;
    let canvas = build_canvas(&state.config.map, &state.dataset, params.mode);

    // The response carries the document this request rendered; the file on
    // disk is shared, so writes are serialized and never read back.
    let written = {
        let _guard = state.export_lock.lock().unwrap_or_else(|e| e.into_inner());
        canvas.save(path)
    };

    match written {
        Ok(html) => {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("uttar_pradesh_map.html");
            (
                [
                    (header::CONTENT_TYPE, "text/html".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                html,
            )
                .into_response()
        }
        Err(e) => {
            error!("Export to {:?} failed: {:#}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Export failed: {e:#}")).into_response()
        }
    }
}

async fn markers_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModeParams>,
) -> Json<Vec<MarkerSpec>> {
    Json(markers_for_mode(&state.dataset.stations, params.mode))
}

async fn interaction_handler(
    State(state): State<Arc<AppState>>,
    Json(clicked): Json<ClickedPoint>,
) -> Json<InteractionReport> {
    let district = state.district_at(clicked.lat, clicked.lng).map(str::to_string);
    debug!("Map clicked at ({}, {}) -> {:?}", clicked.lat, clicked.lng, district);
    Json(InteractionReport {
        last_clicked: clicked,
        district,
    })
}

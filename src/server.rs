use crate::config::AppConfig;
use crate::export::{self, SAVED_LABEL};
use crate::projection::project;
use crate::query::{by_region, distinct_regions, search};
use crate::render::render_document;
use crate::types::{Dataset, MapDescription, Zoom, ZoomError};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub const NO_RESULTS_MESSAGE: &str = "Nenhuma escola encontrada.";

pub struct AppState {
    pub dataset: Dataset,
    pub config: AppConfig,
    // Most recently displayed view, consumed by export.
    pub last_rendered: Mutex<Option<MapDescription>>,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        Self {
            dataset,
            config,
            last_rendered: Mutex::new(None),
        }
    }

    fn remember(&self, map: &MapDescription) {
        let mut last = self.last_rendered.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(map.clone());
    }

    fn last_for_region(&self, region: &str) -> Option<MapDescription> {
        let last = self.last_rendered.lock().unwrap_or_else(|e| e.into_inner());
        last.as_ref().filter(|m| m.region == region).cloned()
    }

    fn default_region(&self) -> String {
        distinct_regions(&self.dataset).into_iter().next().unwrap_or_default()
    }

    fn view(&self, region: &str, zoom: Zoom) -> MapDescription {
        project(&by_region(&self.dataset, region), zoom, region, &self.config.map)
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<ZoomError> for ApiError {
    fn from(e: ZoomError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MapParams {
    region: Option<String>,
    zoom: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    regions: Vec<String>,
    default: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    name: String,
    address: String,
    inep_code: String,
    region_code: String,
    municipality: String,
    summary: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    results: Vec<SearchHit>,
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    path: String,
    label: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    let snapshots = ServeDir::new(&state.config.output.snapshot_dir);
    let assets = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/regions", get(regions_handler))
        .route("/api/map", get(map_handler))
        .route("/api/search", get(search_handler))
        .route("/api/export", post(export_handler))
        .route("/map", get(map_page_handler))
        .nest_service("/snapshots", snapshots)
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, dataset));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Json<RegionsResponse> {
    let regions = distinct_regions(&state.dataset);
    let default = regions.first().cloned();
    Json(RegionsResponse { regions, default })
}

fn resolve_view(state: &AppState, params: MapParams) -> Result<MapDescription, ApiError> {
    let region = params.region.unwrap_or_else(|| state.default_region());
    let zoom = match params.zoom {
        Some(level) => Zoom::new(level)?,
        None => state.config.map.default_zoom()
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    };

    let map = state.view(&region, zoom);
    debug!("Projected {} markers for {} at zoom {}", map.markers.len(), region, zoom);
    state.remember(&map);
    Ok(map)
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<Json<MapDescription>, ApiError> {
    resolve_view(&state, params).map(Json)
}

async fn map_page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<Html<String>, ApiError> {
    resolve_view(&state, params).map(|map| Html(render_document(&map)))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let query = params.q.unwrap_or_default();
    if query.is_empty() {
        return Json(SearchResponse { results: Vec::new(), message: None });
    }

    let results: Vec<SearchHit> = search(&state.dataset, &query).into_iter()
        .map(|s| SearchHit {
            name: s.name.clone(),
            address: s.address.clone(),
            inep_code: s.inep_code.clone(),
            region_code: s.region_code.clone(),
            municipality: s.municipality.clone(),
            summary: format!("{} - {}", s.name, s.address),
        })
        .collect();
    debug!("Search {:?} matched {} schools", query, results.len());

    let message = results.is_empty().then_some(NO_RESULTS_MESSAGE);
    Json(SearchResponse { results, message })
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<Json<ExportResponse>, ApiError> {
    let region = params.region.unwrap_or_else(|| state.default_region());

    let map = match state.last_for_region(&region) {
        Some(map) => map,
        None => {
            let zoom = state.config.map.default_zoom()
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            state.view(&region, zoom)
        }
    };

    let dir = state.config.output.snapshot_dir.clone();
    let target = region.clone();
    let written = tokio::task::spawn_blocking(move || export::export(&map, &target, &dir))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match written {
        Ok(path) => Ok(Json(ExportResponse {
            path: path.display().to_string(),
            label: SAVED_LABEL,
        })),
        Err(e) => {
            warn!("Export failed for {}: {:#}", region, e);
            Err(ApiError::Internal(format!("{:#}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tests::sample;

    fn state_in(dir: &std::path::Path) -> Arc<AppState> {
        let config = AppConfig::from_toml(&format!(
            "[input]\nspreadsheet = \"unused.csv\"\n[output]\nsnapshot_dir = {:?}\n",
            dir
        ))
        .unwrap();
        Arc::new(AppState::new(config, sample()))
    }

    fn params(region: Option<&str>, zoom: Option<u8>) -> MapParams {
        MapParams { region: region.map(str::to_string), zoom }
    }

    #[tokio::test]
    async fn regions_lists_sorted_codes_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let Json(body) = regions_handler(State(state_in(dir.path()))).await;
        assert_eq!(body.regions, ["MG", "RJ", "SP"]);
        assert_eq!(body.default.as_deref(), Some("MG"));
    }

    #[tokio::test]
    async fn map_defaults_to_first_region_and_configured_zoom() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let Json(map) = map_handler(State(state.clone()), Query(MapParams::default())).await.unwrap();
        assert_eq!(map.region, "MG");
        assert_eq!(map.zoom.level(), 6);
        assert_eq!(map.markers.len(), 1);
    }

    #[tokio::test]
    async fn map_rejects_out_of_range_zoom() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let err = map_handler(State(state), Query(params(Some("SP"), Some(0)))).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn map_page_renders_html() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let Html(page) = map_page_handler(State(state), Query(params(Some("SP"), Some(10)))).await.unwrap();
        assert!(page.contains("Escolas no Estado SP"));
    }

    #[tokio::test]
    async fn search_reports_no_results_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        let Json(found) = search_handler(State(state.clone()), Query(SearchParams { q: Some("centro".into()) })).await;
        assert_eq!(found.results.len(), 2);
        assert_eq!(found.results[0].summary, "Escola Municipal Centro - Rua Escola Municipal Centro");
        assert!(found.message.is_none());

        let Json(none) = search_handler(State(state.clone()), Query(SearchParams { q: Some("zzz".into()) })).await;
        assert!(none.results.is_empty());
        assert_eq!(none.message, Some(NO_RESULTS_MESSAGE));

        let Json(empty) = search_handler(State(state), Query(SearchParams { q: None })).await;
        assert!(empty.results.is_empty());
        assert!(empty.message.is_none());
    }

    #[tokio::test]
    async fn export_uses_last_displayed_map_for_region() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        map_handler(State(state.clone()), Query(params(Some("SP"), Some(14)))).await.unwrap();

        let Json(saved) = export_handler(State(state), Query(ExportParams { region: Some("SP".into()) }))
            .await
            .unwrap();
        assert_eq!(saved.label, SAVED_LABEL);
        let content = std::fs::read_to_string(dir.path().join("map_SP.html")).unwrap();
        assert!(content.contains("data-zoom=\"14\""));
    }

    #[tokio::test]
    async fn export_projects_fresh_view_for_other_region() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        map_handler(State(state.clone()), Query(params(Some("SP"), Some(14)))).await.unwrap();

        export_handler(State(state), Query(ExportParams { region: Some("RJ".into()) }))
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("map_RJ.html")).unwrap();
        assert!(content.contains("Escolas no Estado RJ"));
        assert!(content.contains("data-zoom=\"6\""));
    }

    #[tokio::test]
    async fn export_reports_written_path_per_region() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        let Json(sp) = export_handler(State(state.clone()), Query(ExportParams { region: Some("SP".into()) }))
            .await
            .unwrap();
        let Json(rj) = export_handler(State(state), Query(ExportParams { region: Some("RJ".into()) }))
            .await
            .unwrap();
        assert_eq!(sp.path, dir.path().join("map_SP.html").display().to_string());
        assert_eq!(rj.path, dir.path().join("map_RJ.html").display().to_string());
        assert!(dir.path().join("map_SP.html").exists());
        assert!(dir.path().join("map_RJ.html").exists());
    }

    #[tokio::test]
    async fn export_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let state = state_in(&blocker);

        let err = export_handler(State(state), Query(ExportParams { region: Some("SP".into()) }))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::render::{Palette, RenderModel};
use crate::session::{Event, SessionStore};
use crate::types::MarkerId;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub palette: Palette,
    pub sessions: SessionStore,
}

#[derive(Deserialize)]
pub struct RegionQuery {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct RegionResponse {
    name: String,
    notable_places: Vec<String>,
}

#[derive(Deserialize)]
pub struct SelectionRequest {
    regions: HashSet<String>,
}

#[derive(Deserialize)]
pub struct ClickRequest {
    marker_id: String,
}

#[derive(Serialize)]
pub struct SessionCreated {
    id: Uuid,
    model: RenderModel,
}

pub enum ApiError {
    SessionNotFound(Uuid),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("session {id} not found") })),
            )
                .into_response(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/regions", get(regions_handler))
        .route("/api/region", get(region_at_handler))
        .route("/api/sessions", post(create_session_handler))
        .route(
            "/api/sessions/:id",
            get(session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/:id/selection", put(selection_handler))
        .route("/api/sessions/:id/clicks", post(click_handler))
        .with_state(state)
}

pub async fn start_server(config: AppConfig, catalog: Catalog) -> Result<()> {
    let palette = config.palette.to_palette()?;
    let state = Arc::new(AppState {
        catalog: Arc::new(catalog),
        palette,
        sessions: SessionStore::with_ttl(config.server.session_ttl()),
    });
    spawn_session_sweeper(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let mut app = build_router(state);
    if let Some(static_dir) = &config.server.static_dir {
        info!("Serving static files from {:?}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }
    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_session_sweeper(state: Arc<AppState>) {
    let period = state
        .sessions
        .ttl()
        .clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let expired = state.sessions.expire_idle();
            if expired > 0 {
                info!(expired, active = state.sessions.len(), "Expired idle sessions");
            }
        }
    });
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .catalog
            .region_names()
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

async fn region_at_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionQuery>,
) -> Json<Option<RegionResponse>> {
    Json(
        state
            .catalog
            .region_at(params.lat, params.lon)
            .map(|region| RegionResponse {
                name: region.name.clone(),
                notable_places: region.notable_places.clone(),
            }),
    )
}

async fn create_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionCreated> {
    let id = state.sessions.create();
    let model = state
        .sessions
        .get(&id)
        .unwrap_or_default()
        .render(&state.catalog, &state.palette);
    info!(%id, active = state.sessions.len(), "Session started");
    Json(SessionCreated { id, model })
}

async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RenderModel>, ApiError> {
    let session = state.sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(session.render(&state.catalog, &state.palette)))
}

async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectionRequest>,
) -> Result<Json<RenderModel>, ApiError> {
    for name in &body.regions {
        if state.catalog.region(name).is_none() {
            debug!(%id, region = %name, "Unknown region selected");
        }
    }
    transition(&state, id, Event::SelectionChanged(body.regions))
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ClickRequest>,
) -> Result<Json<RenderModel>, ApiError> {
    let marker_id = MarkerId::from(body.marker_id);
    match state.catalog.poi(&marker_id) {
        Some(poi) => debug!(%id, place = %poi.place, "Marker clicked"),
        None => debug!(%id, %marker_id, "Unknown marker clicked"),
    }
    transition(&state, id, Event::MarkerClicked(marker_id))
}

fn transition(state: &AppState, id: Uuid, event: Event) -> Result<Json<RenderModel>, ApiError> {
    let session = state
        .sessions
        .transition(&id, event)
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(session.render(&state.catalog, &state.palette)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::square_region;
    use crate::catalog::{builtin_pois, builtin_regions};
    use crate::render::tests::test_palette;
    use axum::body::{self, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app_with(catalog: Catalog) -> Router {
        test_app_with_store(catalog, SessionStore::new())
    }

    fn test_app_with_store(catalog: Catalog, sessions: SessionStore) -> Router {
        build_router(Arc::new(AppState {
            catalog: Arc::new(catalog),
            palette: test_palette(),
            sessions,
        }))
    }

    fn test_app() -> Router {
        test_app_with(Catalog::builtin().expect("catalog"))
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    async fn create_session(app: &Router) -> Uuid {
        let request = Request::post("/api/sessions")
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value = json_body(response).await;
        value["id"].as_str().expect("id").parse().expect("uuid")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let request = Request::get("/healthz").body(Body::empty()).expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn regions_are_sorted_dropdown_options() {
        let request = Request::get("/api/regions").body(Body::empty()).expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        let names: Vec<String> = json_body(response).await;
        assert_eq!(names.len(), 13);
        assert_eq!(names[0], "Alberta");
    }

    #[tokio::test]
    async fn select_then_click_round_trip() {
        let app = test_app();
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/sessions/{id}/selection"),
                serde_json::json!({ "regions": ["Ontario"] }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let model: serde_json::Value = json_body(response).await;
        assert_eq!(model["highlighted_regions"], serde_json::json!(["Ontario"]));
        assert_eq!(model["visible_pois"].as_array().expect("pois").len(), 5);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{id}/clicks"),
                serde_json::json!({ "marker_id": "Ontario_CN Tower_30" }),
            ))
            .await
            .expect("response");
        let model: serde_json::Value = json_body(response).await;
        let cn_tower = model["visible_pois"]
            .as_array()
            .expect("pois")
            .iter()
            .find(|p| p["marker_id"] == "Ontario_CN Tower_30")
            .expect("cn tower")
            .clone();
        assert_eq!(cn_tower["color"], "highlighted");
        assert_eq!(cn_tower["fill"], "#33cc33");
        assert_eq!(model["clicked_info"], "Selected places: CN Tower");
    }

    #[tokio::test]
    async fn sessions_do_not_leak_clicks() {
        let app = test_app();
        let alice = create_session(&app).await;
        let bob = create_session(&app).await;

        app.clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{alice}/clicks"),
                serde_json::json!({ "marker_id": "Ontario_CN Tower_30" }),
            ))
            .await
            .expect("response");

        let request = Request::get(format!("/api/sessions/{bob}"))
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let model: serde_json::Value = json_body(response).await;
        assert_eq!(model["clicked_info"], "Click on markers to see more information.");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = test_app();
        let request = Request::get(format!("/api/sessions/{}", Uuid::new_v4()))
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = json_body(response).await;
        assert!(body["error"].as_str().expect("error").contains("not found"));
    }

    #[tokio::test]
    async fn deleted_session_is_discarded() {
        let app = test_app();
        let id = create_session(&app).await;
        let request = Request::delete(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let request = Request::get(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn region_lookup_uses_boundaries() {
        let mut regions = builtin_regions();
        let ontario = square_region("Ontario", (-95.0, 41.0), (-74.0, 57.0));
        if let Some(region) = regions.iter_mut().find(|r| r.name == "Ontario") {
            region.geometry = ontario.geometry;
        }
        let app = test_app_with(Catalog::new(regions, builtin_pois()).expect("catalog"));

        let request = Request::get("/api/region?lat=43.6426&lon=-79.3871")
            .body(Body::empty())
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let value: serde_json::Value = json_body(response).await;
        assert_eq!(value["name"], "Ontario");
        assert_eq!(value["notable_places"][0], "CN Tower");

        let request = Request::get("/api/region?lat=0&lon=0")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let value: serde_json::Value = json_body(response).await;
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn idle_session_expires() {
        let app = test_app_with_store(
            Catalog::builtin().expect("catalog"),
            SessionStore::with_ttl(Duration::ZERO),
        );
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{id}/clicks"),
                serde_json::json!({ "marker_id": "Ontario_CN Tower_30" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::get(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

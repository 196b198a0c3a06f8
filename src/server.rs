use crate::render::{ChoroplethMap, ChoroplethPage, CountyShape};
use crate::types::Fips;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::info;

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    map: ChoroplethMap,
    by_fips: HashMap<Fips, usize>,
    tree: RTree<AreaIndex>,
}

impl AppState {
    pub fn new(map: ChoroplethMap) -> Self {
        // Screen-space bounds of each projected shape.
        let tree_items: Vec<AreaIndex> = map
            .counties
            .iter()
            .enumerate()
            .filter_map(|(index, county)| {
                let rect = county.projected.bounding_rect()?;
                Some(AreaIndex {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        let tree = RTree::bulk_load(tree_items);

        let by_fips = map
            .counties
            .iter()
            .enumerate()
            .map(|(index, county)| (county.fips(), index))
            .collect();

        Self {
            map,
            by_fips,
            tree,
        }
    }

    fn county_at(&self, x: f64, y: f64) -> Option<&CountyShape> {
        let point = Point::new(x, y);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
            .filter_map(|candidate| self.map.counties.get(candidate.index))
            .find(|county| county.projected.contains(&point))
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    fips: Fips,
    area_name: String,
    state: String,
    bachelors_or_higher: f64,
    color: String,
    tooltip: String,
}

impl From<&CountyShape> for QueryResponse {
    fn from(county: &CountyShape) -> Self {
        Self {
            fips: county.fips(),
            area_name: county.record.area_name.clone(),
            state: county.record.state.clone(),
            bachelors_or_higher: county.record.bachelors_or_higher,
            color: county.color.clone(),
            tooltip: county.tooltip.clone(),
        }
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/query", get(query_handler))
        .route("/api/county/{fips}", get(county_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, map: ChoroplethMap) -> Result<()> {
    info!("Building spatial index for API...");
    let state = Arc::new(AppState::new(map));
    info!(counties = state.map.counties.len(), "Spatial index built.");

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    ChoroplethPage::new(&state.map).into_response()
}

/// County under a screen-space point.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(state.county_at(params.x, params.y).map(QueryResponse::from))
}

/// County as a GeoJSON feature in source coordinates.
async fn county_handler(State(state): State<Arc<AppState>>, Path(fips): Path<String>) -> Response {
    let fips: Fips = match fips.parse() {
        Ok(fips) => fips,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    match state.by_fips.get(&fips).and_then(|&i| state.map.counties.get(i)) {
        Some(county) => Json(county_feature(county)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown county {fips}")).into_response(),
    }
}

fn county_feature(county: &CountyShape) -> geojson::Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("area_name".into(), county.record.area_name.clone().into());
    properties.insert("state".into(), county.record.state.clone().into());
    properties.insert(
        "bachelorsOrHigher".into(),
        county.record.bachelors_or_higher.into(),
    );
    properties.insert("fill".into(), county.color.clone().into());
    properties.insert("tooltip".into(), county.tooltip.clone().into());

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&county.source))),
        id: Some(geojson::feature::Id::Number(county.fips().0.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

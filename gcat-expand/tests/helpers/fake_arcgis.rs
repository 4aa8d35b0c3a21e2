//! Fake ArcGIS REST Server
//!
//! Serves canned `pjson` responses on an ephemeral local port. Every route
//! rejects requests that do not carry `f=pjson`.
//!
//! | Service            | Behavior                                        |
//! |--------------------|-------------------------------------------------|
//! | `Parks/MapServer`  | two polygon/point layers + one table            |
//! | `Single/MapServer` | one layer (id 0)                                |
//! | `Groups/MapServer` | group layer + two leaves                        |
//! | `Flaky/MapServer`  | 503 until the third request, then one layer     |
//! | `Slow/MapServer`   | sleeps 5 s before answering                     |
//! | `Html/MapServer`   | 200 with an HTML body                           |
//! | `Error/MapServer`  | 200 with an ArcGIS `{"error": ...}` body        |
//! | `Agent/MapServer`  | 403 unless User-Agent is `gcat-test/1.0`        |
//! | anything else      | 404                                             |

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_USER_AGENT: &str = "gcat-test/1.0";

/// Running fake server
pub struct FakeArcGis {
    addr: SocketAddr,
    flaky_hits: Arc<AtomicUsize>,
}

impl FakeArcGis {
    /// Bind to 127.0.0.1:0 and serve in a background task
    pub async fn start() -> Self {
        let flaky_hits = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/arcgis/rest/services/Parks/MapServer", get(parks))
            .route("/arcgis/rest/services/Parks/MapServer/:layer_id", get(parks_layer))
            .route("/arcgis/rest/services/Single/MapServer", get(single))
            .route("/arcgis/rest/services/Single/MapServer/:layer_id", get(single_layer))
            .route("/arcgis/rest/services/Groups/MapServer", get(groups))
            .route("/arcgis/rest/services/Slow/MapServer", get(slow))
            .route("/arcgis/rest/services/Html/MapServer", get(html))
            .route("/arcgis/rest/services/Error/MapServer", get(arcgis_error))
            .route("/arcgis/rest/services/Agent/MapServer", get(agent))
            .merge(
                Router::new()
                    .route("/arcgis/rest/services/Flaky/MapServer", get(flaky))
                    .with_state(flaky_hits.clone()),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, flaky_hits }
    }

    /// `http://127.0.0.1:<port>/arcgis/rest/services/<name>/MapServer`
    pub fn service_url(&self, name: &str) -> String {
        format!("http://{}/arcgis/rest/services/{}/MapServer", self.addr, name)
    }

    /// Requests the flaky service has received
    pub fn flaky_hits(&self) -> usize {
        self.flaky_hits.load(Ordering::SeqCst)
    }
}

type Params = Query<HashMap<String, String>>;

fn is_pjson(params: &Params) -> bool {
    params.get("f").map(String::as_str) == Some("pjson")
}

fn bad_format() -> Response {
    (StatusCode::BAD_REQUEST, "missing f=pjson").into_response()
}

async fn parks(params: Params) -> Response {
    if !is_pjson(&params) {
        return bad_format();
    }
    Json(json!({
        "mapName": "Parks",
        "serviceDescription": "City parks",
        "spatialReference": {"wkid": 102100, "latestWkid": 3857},
        "layers": [
            {"id": 0, "name": "Park Boundaries", "geometryType": "esriGeometryPolygon", "subLayerIds": null},
            {"id": 1, "name": "Park Points", "geometryType": "esriGeometryPoint", "subLayerIds": null}
        ],
        "tables": [
            {"id": 2, "name": "Inspections"}
        ]
    }))
    .into_response()
}

async fn parks_layer(Path(layer_id): Path<i64>, params: Params) -> Response {
    if !is_pjson(&params) {
        return bad_format();
    }
    let body: Value = match layer_id {
        0 => json!({
            "id": 0,
            "name": "Park Boundaries",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPolygon",
            "description": "Official park boundaries"
        }),
        1 => json!({
            "id": 1,
            "name": "Park Points",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPoint",
            "description": ""
        }),
        2 => json!({"id": 2, "name": "Inspections", "type": "Table"}),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(body).into_response()
}

async fn single(params: Params) -> Response {
    if !is_pjson(&params) {
        return bad_format();
    }
    Json(json!({
        "mapName": "Single",
        "layers": [{"id": 0, "name": "Hydrants", "geometryType": "esriGeometryPoint"}]
    }))
    .into_response()
}

async fn single_layer(Path(layer_id): Path<i64>, params: Params) -> Response {
    if !is_pjson(&params) || layer_id != 0 {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({"id": 0, "name": "Hydrants", "geometryType": "esriGeometryPoint"})).into_response()
}

async fn groups(params: Params) -> Response {
    if !is_pjson(&params) {
        return bad_format();
    }
    Json(json!({
        "layers": [
            {"id": 0, "name": "Utilities", "subLayerIds": [1, 2]},
            {"id": 1, "name": "Water Mains", "geometryType": "esriGeometryPolyline"},
            {"id": 2, "name": "Valves", "geometryType": "esriGeometryPoint"}
        ]
    }))
    .into_response()
}

async fn flaky(State(hits): State<Arc<AtomicUsize>>, params: Params) -> Response {
    if !is_pjson(&params) {
        return bad_format();
    }
    let hit = hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hit < 3 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({"layers": [{"id": 4, "name": "Recovered", "geometryType": "esriGeometryPolygon"}]}))
        .into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"layers": []})).into_response()
}

async fn html() -> Response {
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Service directory</body></html>",
    )
        .into_response()
}

async fn arcgis_error() -> Response {
    Json(json!({"error": {"code": 499, "message": "Token Required", "details": []}})).into_response()
}

async fn agent(headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if user_agent != TEST_USER_AGENT {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({"layers": [{"id": 0, "name": "Only", "geometryType": "esriGeometryPoint"}]}))
        .into_response()
}

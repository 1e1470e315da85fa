//! HTTP surface: /health, /route, /users/{id}/position (GET, PUT, DELETE), /users/{id}/go and /congestion

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{BoxError, Json, Router};
use chrono::{DateTime, Utc};
use geo::Point;
use geojson::FeatureCollection;
use igo::{Location, RouteService, ServiceError, UserId};
use igo_core::BuildStats;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub type AppState = Arc<RouteService>;

/// A location in a request body: either `{"lon": .., "lat": ..}` or
/// `{"place": ".."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationBody {
    Coordinates { lon: f64, lat: f64 },
    Place { place: String },
}

impl From<LocationBody> for Location {
    fn from(body: LocationBody) -> Self {
        match body {
            LocationBody::Coordinates { lon, lat } => Location::Coordinates(Point::new(lon, lat)),
            LocationBody::Place { place } => Location::Place(place),
        }
    }
}

impl From<Location> for LocationBody {
    fn from(location: Location) -> Self {
        match location {
            Location::Coordinates(point) => LocationBody::Coordinates {
                lon: point.x(),
                lat: point.y(),
            },
            Location::Place(place) => LocationBody::Place { place },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub source: LocationBody,
    pub target: LocationBody,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    built_at: DateTime<Utc>,
    stats: BuildStats,
}

#[derive(Debug, Serialize)]
struct StoredPosition {
    user: UserId,
    lon: f64,
    lat: f64,
}

pub fn router(service: AppState, request_timeout: Duration, max_concurrent: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/route", post(route))
        .route(
            "/users/{id}/position",
            get(get_position).put(set_position).delete(forget_position),
        )
        .route("/users/{id}/go", post(go))
        .route("/congestion", get(congestion))
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout)
                .layer(GlobalConcurrencyLimitLayer::new(max_concurrent)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {err}"),
        )
    }
}

/// Runs a service call on the blocking pool: routing is CPU bound and a
/// stale snapshot is rebuilt inline with blocking feed requests.
async fn blocking<T, F>(service: &AppState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&RouteService) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn health(State(service): State<AppState>) -> Json<Health> {
    let snapshot = service.current_snapshot();
    Json(Health {
        status: "ok",
        built_at: snapshot.built_at(),
        stats: snapshot.stats().clone(),
    })
}

async fn route(
    State(service): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let source = Location::from(request.source);
    let target = Location::from(request.target);
    let plan = blocking(&service, move |service| service.route(&source, &target)).await?;
    tracing::debug!("Route found: {:.0} s over {:.0} m", plan.itime, plan.length);
    Ok(Json(plan.to_geojson().map_err(ServiceError::from)?))
}

async fn set_position(
    State(service): State<AppState>,
    Path(user): Path<UserId>,
    Json(body): Json<LocationBody>,
) -> Result<Json<StoredPosition>, ApiError> {
    let point = blocking(&service, move |service| {
        service.set_position(user, Location::from(body))
    })
    .await?;
    Ok(Json(StoredPosition {
        user,
        lon: point.x(),
        lat: point.y(),
    }))
}

async fn get_position(
    State(service): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Json<LocationBody>, ApiError> {
    service
        .position(user)
        .map(|location| Json(LocationBody::from(location)))
        .ok_or_else(|| ApiError::NotFound(format!("User {user} has no stored position")))
}

async fn forget_position(
    State(service): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Json<LocationBody>, ApiError> {
    service
        .forget(user)
        .map(|location| Json(LocationBody::from(location)))
        .ok_or_else(|| ApiError::NotFound(format!("User {user} has no stored position")))
}

async fn go(
    State(service): State<AppState>,
    Path(user): Path<UserId>,
    Json(target): Json<LocationBody>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let target = Location::from(target);
    let plan = blocking(&service, move |service| service.go(user, &target)).await?;
    Ok(Json(plan.to_geojson().map_err(ServiceError::from)?))
}

async fn congestion(State(service): State<AppState>) -> Result<Json<FeatureCollection>, ApiError> {
    let map = blocking(&service, RouteService::congestion_map).await?;
    Ok(Json(map))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use chrono::NaiveDate;
    use igo::Gazetteer;
    use igo_core::model::{StreetEdge, StreetNode};
    use igo_core::{
        CongestionRecord, CongestionState, RefreshScheduler, StreetGraph, TrafficFeed,
        TrafficSegment, WeightingConfig,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    /// Cuts the direct 2 -> 3 street, leaving the 2 -> 4 -> 3 bypass
    struct CutFeed;

    impl TrafficFeed for CutFeed {
        fn fetch_segments(&self) -> Result<Vec<TrafficSegment>, igo_core::Error> {
            Ok(vec![TrafficSegment {
                id: 21,
                description: "Diagonal".to_string(),
                coordinates: vec![Point::new(0.001, 0.0), Point::new(0.002, 0.0)],
            }])
        }

        fn fetch_congestion(&self) -> Result<Vec<CongestionRecord>, igo_core::Error> {
            let observed_at = NaiveDate::from_ymd_opt(2021, 5, 21)
                .and_then(|date| date.and_hms_opt(9, 55, 0))
                .unwrap();
            Ok(vec![CongestionRecord {
                segment: 21,
                observed_at,
                state: CongestionState::Cut,
            }])
        }
    }

    fn app() -> Router {
        let node = |id, x, y| StreetNode {
            id,
            geometry: Point::new(x, y),
        };
        let base = StreetGraph::from_parts(
            vec![
                node(1, 0.000, 0.0),
                node(2, 0.001, 0.0),
                node(3, 0.002, 0.0),
                node(4, 0.0015, 0.0005),
                node(5, 0.010, 0.0),
            ],
            vec![
                (1, 2, StreetEdge::new(100.0, Some(50.0))),
                (2, 3, StreetEdge::new(100.0, Some(50.0))),
                (2, 4, StreetEdge::new(80.0, Some(50.0))),
                (4, 3, StreetEdge::new(80.0, Some(50.0))),
            ],
        )
        .unwrap();
        let scheduler = RefreshScheduler::new(
            Arc::new(base),
            CutFeed,
            WeightingConfig::default(),
            Duration::from_secs(300),
        )
        .unwrap();
        let places = Gazetteer::new([("home", Point::new(0.0, 0.0))]);
        let service = RouteService::new(Arc::new(scheduler), places, 500.0);
        router(Arc::new(service), Duration::from_secs(5), 4)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_the_snapshot() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["stats"]["impassable_edges"], 1);
    }

    #[tokio::test]
    async fn route_avoids_cut_street() {
        let request = json_request(
            "POST",
            "/route",
            serde_json::json!({
                "source": { "place": "home" },
                "target": { "lon": 0.002, "lat": 0.0 },
            }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["type"], "FeatureCollection");
        // A -> B -> bypass -> C
        assert_eq!(json["features"][0]["properties"]["nodes"], 4);
        assert_eq!(json["features"][1]["properties"]["role"], "source");
    }

    #[tokio::test]
    async fn unreachable_target_is_not_found() {
        // Node 5 has no incoming street
        let request = json_request(
            "POST",
            "/route",
            serde_json::json!({
                "source": { "lon": 0.0, "lat": 0.0 },
                "target": { "lon": 0.010, "lat": 0.0 },
            }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_place_is_unprocessable() {
        let request = json_request(
            "POST",
            "/route",
            serde_json::json!({
                "source": { "place": "Atlantis" },
                "target": { "place": "home" },
            }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn go_without_position_conflicts() {
        let request = json_request(
            "POST",
            "/users/9/go",
            serde_json::json!({ "lon": 0.002, "lat": 0.0 }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn stored_position_is_used_by_go() {
        let app = app();

        let request = json_request(
            "PUT",
            "/users/9/position",
            serde_json::json!({ "place": "home" }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["lon"], 0.0);

        let response = app
            .clone()
            .oneshot(Request::get("/users/9/position").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::json!({ "place": "home" }));

        let request = json_request(
            "POST",
            "/users/9/go",
            serde_json::json!({ "lon": 0.002, "lat": 0.0 }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_position_is_not_found() {
        let response = app()
            .oneshot(Request::get("/users/1/position").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleted_position_is_gone() {
        let app = app();

        let request = json_request(
            "PUT",
            "/users/5/position",
            serde_json::json!({ "place": "home" }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::delete("/users/5/position").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "place": "home" }));

        let response = app
            .clone()
            .oneshot(Request::get("/users/5/position").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::delete("/users/5/position").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn congestion_map_is_served() {
        let response = app()
            .oneshot(Request::get("/congestion").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["features"][0]["properties"]["colour"], "black");
    }
}

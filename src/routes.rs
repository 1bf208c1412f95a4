use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::Level;

use crate::config::CorsConfig;
use crate::handlers::{devices, health};
use crate::services::DeviceService;

pub fn create_router(service: DeviceService, cors: &CorsConfig) -> Router {
    let api_routes = Router::new()
        .route("/api/devices", get(devices::list_devices))
        .route("/api/devices/register", post(devices::register_device))
        .route("/api/devices/{uuid}", get(devices::get_device))
        .route(
            "/api/devices/{uuid}/status",
            patch(devices::update_device_status),
        )
        .route("/api/devices/{uuid}/data", get(devices::get_device_data));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(api_routes)
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request| {
                            tracing::span!(
                                Level::INFO,
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                            )
                        })
                        .on_request(|_request: &Request, _span: &tracing::Span| {
                            tracing::event!(Level::DEBUG, "received request");
                        })
                        .on_response(
                            |response: &axum::response::Response,
                             latency: std::time::Duration,
                             _span: &tracing::Span| {
                                tracing::event!(
                                    Level::INFO,
                                    status = response.status().as_u16(),
                                    latency = ?latency,
                                    "request completed"
                                );
                            },
                        ),
                )
                .layer(cors_layer(cors)),
        )
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

use axum::body::Body;
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use opinio_core::prelude::*;
use tower::ServiceExt;

#[route(GET, "/health", group = "OPS")]
async fn health() -> &'static str {
    "ok"
}

#[route("post", "/echo/:word")]
fn echo(Path(word): Path<String>) -> String {
    word.to_uppercase()
}

pub struct HealthController;

#[controller("")]
impl HealthController {
    #[get("/health", group = "OPS")]
    async fn health(&self) -> &'static str {
        "ok"
    }
}

#[test]
fn functional_and_controller_routes_are_equivalent() {
    let functional = health_route();

    let mut registry = RouteRegistry::new();
    registry.controller(HealthController).unwrap();
    let class_style = &registry.routes()[0];

    assert_eq!(functional.method(), class_style.method());
    assert_eq!(functional.path(), class_style.path());
    assert_eq!(functional.group(), class_style.group());
    assert_eq!(functional.handler_name(), class_style.handler_name());
    assert_eq!(functional.controller(), None);
    assert_eq!(class_style.controller(), Some("HealthController"));
}

#[test]
fn functional_route_collides_like_controller_route() {
    let mut registry = RouteRegistry::new();
    registry.controller(HealthController).unwrap();

    let err = registry.register_route(health_route()).unwrap_err();
    assert!(matches!(err, opinio_core::RegistryError::DuplicateRoute { .. }));
}

fn routes(registry: &mut RouteRegistry) -> anyhow::Result<()> {
    registry.register_route(health_route())?;
    registry.register_route(echo_route())?;
    Ok(())
}

#[tokio::test]
async fn functional_routes_are_served() {
    let mut app = App::create(AppOptions::new("ops"), Manifest::new().module("ops", routes));
    let router = app.router().unwrap();

    let response = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::post("/echo/hello").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"HELLO");

    let echo = app.routes().iter().find(|r| r.handler_name() == "echo").unwrap();
    assert_eq!(echo.method(), HttpMethod::Post);
    assert_eq!(echo.group(), None);
}

#[route(GET, "/socket/status")]
async fn socket_status() -> Result<String, opinio_core::PluginError> {
    Err(opinio_core::PluginError::NotEnabled("socket".into()))
}

#[tokio::test]
async fn plugin_errors_become_server_errors() {
    let router = Router::new().route("/socket/status", socket_status_route().handler().clone());

    let response = router
        .oneshot(Request::get("/socket/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json["detail"],
        "Plugin error: plugin 'socket' is not enabled or not installed"
    );
}

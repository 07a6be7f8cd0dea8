use axum::body::Body;
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use axum::Json;
use opinio_core::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
pub struct UserController {
    users: Mutex<Vec<String>>,
}

#[controller("/users", group = "USERS")]
impl UserController {
    #[get("/")]
    async fn list_users(&self) -> Json<Vec<String>> {
        Json(self.users.lock().clone())
    }

    #[post("/", group = "ADMIN")]
    async fn create_user(&self, Json(name): Json<String>) -> StatusCode {
        self.users.lock().push(name);
        StatusCode::CREATED
    }

    #[get("/:id")]
    async fn get_user(&self, Path(id): Path<usize>) -> Result<String, StatusCode> {
        self.users.lock().get(id).cloned().ok_or(StatusCode::NOT_FOUND)
    }

    #[http(DELETE, "/:id")]
    fn delete_user(&self, Path(id): Path<usize>) -> StatusCode {
        let mut users = self.users.lock();
        if id < users.len() {
            users.remove(id);
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }

    #[get("count")]
    fn count(self: Arc<Self>) -> String {
        self.users.lock().len().to_string()
    }

    #[head("/")]
    async fn head_users() -> StatusCode {
        StatusCode::OK
    }

    /// 没有路由标记的方法保持原样
    fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

#[derive(Default)]
pub struct RootController;

#[controller("")]
impl RootController {
    #[options("/ping")]
    async fn ping(&self) -> &'static str {
        "pong"
    }
}

fn registry() -> RouteRegistry {
    let mut registry = RouteRegistry::new();
    registry.controller(UserController::default()).unwrap();
    registry.controller(RootController).unwrap();
    registry
}

async fn send(router: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[test]
fn every_marker_yields_one_descriptor() {
    let registry = registry();
    let users: Vec<_> = registry
        .routes()
        .iter()
        .filter(|r| r.controller() == Some("UserController"))
        .collect();

    assert_eq!(users.len(), 6);
    assert_eq!(registry.len(), 7);
    assert_eq!(
        registry.controllers(),
        &["UserController".to_string(), "RootController".to_string()]
    );
}

#[test]
fn user_controller_list_route_metadata() {
    let registry = registry();
    let route = registry.find(HttpMethod::Get, "/users/").unwrap();

    assert_eq!(route.method(), HttpMethod::Get);
    assert_eq!(route.path(), "/users/");
    assert_eq!(route.group(), Some("USERS"));
    assert_eq!(route.handler_name(), "list_users");
    assert_eq!(route.handler_id(), "UserController::list_users");
}

#[test]
fn paths_and_groups_follow_controller() {
    let registry = registry();

    let create = registry.find(HttpMethod::Post, "/users/").unwrap();
    assert_eq!(create.group(), Some("ADMIN"));

    assert!(registry.find(HttpMethod::Get, "/users/:id").is_some());
    assert!(registry.find(HttpMethod::Delete, "/users/:id").is_some());
    assert!(registry.find(HttpMethod::Get, "/users/count").is_some());
    assert!(registry.find(HttpMethod::Head, "/users/").is_some());

    let ping = registry.find(HttpMethod::Options, "/ping").unwrap();
    assert_eq!(ping.group(), None);
    assert_eq!(ping.controller(), Some("RootController"));
}

#[test]
fn unmarked_methods_are_kept() {
    assert_eq!(UserController::normalize("  Budi "), "budi");
}

fn routes(registry: &mut RouteRegistry) -> anyhow::Result<()> {
    registry.controller(UserController::default())?;
    registry.controller(RootController)?;
    Ok(())
}

#[tokio::test]
async fn handlers_share_one_controller_instance() {
    let manifest = Manifest::new().module("app::domains::users::controllers::user_controller", routes);
    let mut app = App::create(AppOptions::new("users"), manifest);
    let router = app.router().unwrap();
    assert_eq!(app.routes().len(), 7);

    assert_eq!(send(&router, "POST", "/users/", Body::from("\"john\"")).await.0, StatusCode::CREATED);
    assert_eq!(send(&router, "POST", "/users/", Body::from("\"budi\"")).await.0, StatusCode::CREATED);

    assert_eq!(
        send(&router, "GET", "/users/", Body::empty()).await,
        (StatusCode::OK, "[\"john\",\"budi\"]".to_string())
    );
    assert_eq!(
        send(&router, "GET", "/users/1", Body::empty()).await,
        (StatusCode::OK, "budi".to_string())
    );
    assert_eq!(send(&router, "DELETE", "/users/0", Body::empty()).await.0, StatusCode::NO_CONTENT);
    assert_eq!(
        send(&router, "GET", "/users/count", Body::empty()).await,
        (StatusCode::OK, "1".to_string())
    );
    assert_eq!(send(&router, "GET", "/users/5", Body::empty()).await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&router, "OPTIONS", "/ping", Body::empty()).await,
        (StatusCode::OK, "pong".to_string())
    );
}

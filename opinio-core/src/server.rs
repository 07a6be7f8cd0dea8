//! Web 服务器
//!
//! 基于 `axum::serve`，支持优雅关闭

use crate::constants::{SERVER_ENABLE_CORS, SERVER_ENABLE_REQUEST_LOGGING, SERVER_HOST, SERVER_PORT};
use crate::config::Environment;
use crate::error::{AppError, AppResult};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Web 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProperties {
    /// 服务器监听地址
    pub host: String,

    /// 服务器监听端口
    pub port: u16,

    /// 是否启用 CORS
    pub enable_cors: bool,

    /// 是否启用请求日志
    pub enable_request_logging: bool,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: false,
            enable_request_logging: true,
        }
    }
}

impl ServerProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            host: env.get_string(SERVER_HOST).unwrap_or(defaults.host),
            port: env
                .get_i64(SERVER_PORT)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            enable_cors: env.get_bool(SERVER_ENABLE_CORS).unwrap_or(defaults.enable_cors),
            enable_request_logging: env
                .get_bool(SERVER_ENABLE_REQUEST_LOGGING)
                .unwrap_or(defaults.enable_request_logging),
        }
    }

    /// 获取服务器地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 请求日志中间件
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        elapsed = ?start.elapsed(),
        "Request completed"
    );

    response
}

/// 按配置挂上服务器级中间件
pub fn apply_layers(router: Router, props: &ServerProperties) -> Router {
    let mut router = router;
    if props.enable_request_logging {
        router = router.layer(middleware::from_fn(request_logging));
    }
    if props.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

/// 启动服务器，`signal` 完成后优雅关闭
pub async fn serve<S>(router: Router, props: &ServerProperties, signal: S) -> AppResult<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = props.address();
    let app = apply_layers(router, props);

    tracing::info!("🚀 Starting server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("✅ Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .map_err(AppError::Server)?;

    tracing::info!("Server stopped");
    Ok(())
}

/// 等待 Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

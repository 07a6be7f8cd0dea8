//! 应用层错误类型
//!
//! 各子模块定义自己的错误（`RegistryError`、`DiscoveryError`、`PluginError`），
//! 这里汇总为装配和运行阶段统一返回的 `AppError`。
//! 用户提供的回调（控制器模块注册、生命周期钩子）使用 `anyhow::Result`。

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::plugin::PluginError;
use crate::registry::RegistryError;

pub use anyhow::Result;

/// 装配与运行阶段的错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// 用户 lifespan 钩子失败
    #[error("lifespan {stage} hook failed: {source}")]
    Lifespan {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// 发现的路由与基础 `Router` 中的路由重叠
    #[error("route {path} conflicts with the base router: {message}")]
    RouteConflict { path: String, message: String },

    /// 路由已经装配，不能再启用会注册路由的插件
    #[error("application router is already assembled; enable plugins before calling router()")]
    Sealed,

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("failed to load configuration: {0}")]
    Config(String),

    #[error("failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

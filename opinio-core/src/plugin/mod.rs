//! 插件机制
//!
//! 插件实现 [`Plugin`] trait，所有钩子都是可选的。
//! 四个核心生命周期钩子（同步/异步 ready、同步/异步 shutdown）通过能力访问器声明：
//! 插件返回 `Some(self)` 表示具备该能力，宿主只调用已声明的能力。

mod catalog;
mod host;

pub use catalog::{EnabledPlugins, PluginCatalog};
pub use host::PluginHost;

use crate::config::Environment;
use crate::controller::ControllerDescriptor;
use crate::registry::{RegistryError, RouteRegistry};
use crate::route::RouteDescriptor;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// 插件钩子的返回类型
pub type PluginResult<T> = anyhow::Result<T>;

/// 插件对外暴露的 API 对象
pub type PluginApi = Arc<dyn Any + Send + Sync>;

/// 插件错误
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin '{0}' is already enabled")]
    AlreadyEnabled(String),

    #[error("plugin '{0}' is not enabled or not installed")]
    NotEnabled(String),

    #[error("plugin '{0}' is not in the plugin catalog")]
    Unknown(String),

    #[error("plugin '{0}' requires configuration; add a [plugins.{0}] section")]
    MissingConfig(String),

    #[error("plugin '{0}' declares an API but install() returned none")]
    MissingApi(String),

    #[error("plugin '{plugin}' failed during {stage}: {source}")]
    Hook {
        plugin: String,
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin '{plugin}' failed to register routes: {source}")]
    Routes {
        plugin: String,
        #[source]
        source: RegistryError,
    },

    #[error("failed to access enabled plugins file {path:?}: {message}")]
    EnabledFile { path: PathBuf, message: String },
}

/// 处理函数可以直接返回 `Result<_, PluginError>`，失败时响应 500
impl IntoResponse for PluginError {
    fn into_response(self) -> Response {
        tracing::error!("Plugin error occurred: {}", self);
        let body = Json(serde_json::json!({ "detail": format!("Plugin error: {}", self) }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl PluginError {
    pub(crate) fn hook(plugin: &str, stage: &'static str, source: anyhow::Error) -> Self {
        PluginError::Hook {
            plugin: plugin.to_string(),
            stage,
            source,
        }
    }
}

/// 插件钩子可见的应用上下文
///
/// 克隆开销很小，内部共享同一份状态
#[derive(Clone)]
pub struct PluginContext {
    app_name: Arc<str>,
    environment: Arc<Environment>,
    apis: Arc<RwLock<HashMap<String, PluginApi>>>,
}

impl PluginContext {
    pub fn new(app_name: impl Into<String>, environment: Arc<Environment>) -> Self {
        Self {
            app_name: Arc::from(app_name.into()),
            environment,
            apis: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 获取其他插件暴露的 API
    pub fn api<T: Any + Send + Sync>(&self, plugin: &str) -> Option<Arc<T>> {
        let api = self.apis.read().get(plugin).cloned()?;
        api.downcast::<T>().ok()
    }

    pub(crate) fn publish_api(&self, plugin: &str, api: PluginApi) {
        self.apis.write().insert(plugin.to_string(), api);
    }

    pub(crate) fn withdraw_api(&self, plugin: &str) {
        self.apis.write().remove(plugin);
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("app_name", &self.app_name)
            .field("apis", &self.apis.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 插件配置，来自 `[plugins.<name>]` 配置段或 `App::enable_with_config`
#[derive(Debug, Clone, Default)]
pub struct PluginConfig(Option<serde_json::Value>);

impl PluginConfig {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(value: serde_json::Value) -> Self {
        Self(Some(value))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        }
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        self.0.as_ref()
    }

    /// 反序列化为插件自己的配置类型
    pub fn parse<T: DeserializeOwned>(&self) -> PluginResult<T> {
        let value = self.0.clone().unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

impl From<serde_json::Value> for PluginConfig {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// 安装阶段的上下文：读取配置、注册路由
pub struct InstallContext<'a> {
    plugin: &'a str,
    config: &'a PluginConfig,
    registry: &'a mut RouteRegistry,
}

impl<'a> InstallContext<'a> {
    pub(crate) fn new(plugin: &'a str, config: &'a PluginConfig, registry: &'a mut RouteRegistry) -> Self {
        Self {
            plugin,
            config,
            registry,
        }
    }

    pub fn config(&self) -> &PluginConfig {
        self.config
    }

    pub fn register_route(&mut self, route: RouteDescriptor) -> Result<(), PluginError> {
        self.registry
            .register_route(route)
            .map_err(|source| PluginError::Routes {
                plugin: self.plugin.to_string(),
                source,
            })
    }

    pub fn register_controller(&mut self, controller: ControllerDescriptor) -> Result<usize, PluginError> {
        self.registry
            .register_controller(controller)
            .map_err(|source| PluginError::Routes {
                plugin: self.plugin.to_string(),
                source,
            })
    }
}

/// 同步 ready 钩子，在插件启用时立即调用
pub trait ReadyHook: Send + Sync {
    fn on_ready(&self, ctx: &PluginContext) -> PluginResult<()>;
}

/// 异步 ready 钩子，在应用启动阶段按启用顺序依次等待
#[async_trait]
pub trait AsyncReadyHook: Send + Sync {
    async fn on_ready_async(&self, ctx: &PluginContext) -> PluginResult<()>;
}

/// 同步 shutdown 钩子
pub trait ShutdownHook: Send + Sync {
    fn on_shutdown(&self, ctx: &PluginContext) -> PluginResult<()>;
}

/// 异步 shutdown 钩子，在同步 shutdown 之后调用
#[async_trait]
pub trait AsyncShutdownHook: Send + Sync {
    async fn on_shutdown_async(&self, ctx: &PluginContext) -> PluginResult<()>;
}

/// 应用插件 trait
///
/// # 示例
///
/// ```ignore
/// struct Metrics;
///
/// impl Plugin for Metrics {
///     fn name(&self) -> &str { "metrics" }
///     fn ready(&self) -> Option<&dyn ReadyHook> { Some(self) }
/// }
///
/// impl ReadyHook for Metrics {
///     fn on_ready(&self, _ctx: &PluginContext) -> PluginResult<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 插件名称，同时作为 API 和配置段的键
    fn name(&self) -> &str;

    /// 是否必须提供配置
    fn requires_config(&self) -> bool {
        false
    }

    /// `install()` 是否必须返回 API 对象
    fn provides_api(&self) -> bool {
        false
    }

    /// 启用前校验
    fn on_pre_enable(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// 安装：注册路由、构造对外 API
    fn install(&self, _ctx: &PluginContext, _install: &mut InstallContext<'_>) -> PluginResult<Option<PluginApi>> {
        Ok(None)
    }

    /// 启用后、API 发布前
    fn on_enable(&self, _ctx: &PluginContext, _api: Option<&PluginApi>) -> PluginResult<()> {
        Ok(())
    }

    /// 完全启用后
    fn on_post_enable(&self, _ctx: &PluginContext, _api: Option<&PluginApi>) -> PluginResult<()> {
        Ok(())
    }

    /// 所有插件启用完成，控制器发现之前
    fn on_plugins_loaded(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// 控制器发现完成
    fn on_controllers_loaded(&self, _ctx: &PluginContext, _routes: &[RouteDescriptor]) -> PluginResult<()> {
        Ok(())
    }

    /// 启动序列的最后一步，开始服务之前
    fn on_app_ready(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// 关闭序列的第一步，在 shutdown 钩子之前
    fn on_before_shutdown(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// 紧接 `on_before_shutdown`，可以等待连接排空等异步操作
    async fn on_before_shutdown_async(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    fn ready(&self) -> Option<&dyn ReadyHook> {
        None
    }

    fn ready_async(&self) -> Option<&dyn AsyncReadyHook> {
        None
    }

    fn shutdown(&self) -> Option<&dyn ShutdownHook> {
        None
    }

    fn shutdown_async(&self) -> Option<&dyn AsyncShutdownHook> {
        None
    }
}

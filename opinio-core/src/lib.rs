//! # Opinio
//!
//! 基于 axum 的约定式 Web 应用层
//!
//! ## 核心特性
//!
//! - **注解式路由** - `#[controller]` / `#[get]` / `#[route]` 宏生成路由描述
//! - **约定式发现** - `app/domains/*/controllers/` 下的模块通过构建期清单加载
//! - **插件生命周期** - 启用、装配、启动、关闭各阶段的可选钩子
//! - **统一配置** - TOML + profile + 环境变量

pub mod app;
pub mod config;
pub mod constants;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod lifespan;
pub mod logging;
pub mod plugin;
pub mod registry;
pub mod route;
pub mod server;

// 重新导出常用类型
pub use app::{App, AppOptions};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use controller::{Controller, ControllerDescriptor};
pub use discovery::{Discovery, DiscoveryError, DiscoveryReport, Manifest, ModuleEntry};
pub use error::{AppError, AppResult, Result};
pub use lifespan::Lifespan;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use plugin::{
    AsyncReadyHook, AsyncShutdownHook, EnabledPlugins, InstallContext, Plugin, PluginApi,
    PluginCatalog, PluginConfig, PluginContext, PluginError, PluginHost, PluginResult, ReadyHook,
    ShutdownHook,
};
pub use registry::{RegistryError, RouteRegistry};
pub use route::{HttpMethod, RouteDescriptor};
pub use server::ServerProperties;

// 导出宏及其展开代码依赖的 crate
pub use opinio_macros::{controller, route};
pub use anyhow;
pub use async_trait;
pub use axum;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::{App, AppOptions};
    pub use crate::config::Environment;
    pub use crate::controller::{Controller, ControllerDescriptor};
    pub use crate::discovery::Manifest;
    pub use crate::error::{AppError, AppResult};
    pub use crate::lifespan::Lifespan;
    pub use crate::logging::LoggingConfig;
    pub use crate::plugin::{
        AsyncReadyHook, AsyncShutdownHook, InstallContext, Plugin, PluginApi, PluginContext,
        PluginResult, ReadyHook, ShutdownHook,
    };
    pub use crate::registry::RouteRegistry;
    pub use crate::route::{HttpMethod, RouteDescriptor};
    pub use crate::server::ServerProperties;
    pub use opinio_macros::{controller, route};

    pub use async_trait::async_trait;
    pub use axum::extract::{Json, Path, Query, State};
    pub use axum::http::StatusCode;
    pub use axum::response::{IntoResponse, Response};
    pub use axum::Router;
}

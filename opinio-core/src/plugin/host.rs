//! 插件宿主
//!
//! 按启用顺序保存插件，在装配、启动、关闭的各个阶段调用对应钩子。
//! 启动阶段任何钩子失败立即中止；关闭阶段会尝试所有插件，返回第一个错误。

use super::{InstallContext, Plugin, PluginApi, PluginConfig, PluginContext, PluginError};
use crate::registry::RouteRegistry;
use crate::route::RouteDescriptor;
use std::any::Any;
use std::sync::Arc;

struct EnabledPlugin {
    name: String,
    plugin: Arc<dyn Plugin>,
}

/// 插件宿主
pub struct PluginHost {
    ctx: PluginContext,
    plugins: Vec<EnabledPlugin>,
}

impl PluginHost {
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            plugins: Vec::new(),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    /// 启用插件
    ///
    /// 顺序：pre_enable → 配置校验 → install → on_enable → 发布 API → 同步 ready → post_enable。
    /// 异步 ready 钩子留到 [`PluginHost::startup`]。
    /// install 注册的路由先写入暂存注册表，全部步骤成功后才提交；
    /// 任何一步失败，路由被丢弃、API 被撤回，插件保持未启用状态。
    pub fn enable(
        &mut self,
        plugin: Arc<dyn Plugin>,
        config: PluginConfig,
        registry: &mut RouteRegistry,
    ) -> Result<Option<PluginApi>, PluginError> {
        let name = plugin.name().to_string();
        if self.is_enabled(&name) {
            return Err(PluginError::AlreadyEnabled(name));
        }

        tracing::debug!("Enabling plugin: {}", name);
        let mut staged = registry.clone();
        let api = match self.run_enable(plugin.as_ref(), &name, &config, &mut staged) {
            Ok(api) => api,
            Err(e) => {
                self.ctx.withdraw_api(&name);
                tracing::error!("Failed to enable plugin {}: {}", name, e);
                return Err(e);
            }
        };

        *registry = staged;
        tracing::info!("✅ Plugin enabled: {}", name);
        self.plugins.push(EnabledPlugin { name, plugin });
        Ok(api)
    }

    fn run_enable(
        &self,
        plugin: &dyn Plugin,
        name: &str,
        config: &PluginConfig,
        staged: &mut RouteRegistry,
    ) -> Result<Option<PluginApi>, PluginError> {
        let ctx = &self.ctx;

        plugin
            .on_pre_enable(ctx)
            .map_err(|e| PluginError::hook(name, "pre_enable", e))?;

        if plugin.requires_config() && config.is_empty() {
            return Err(PluginError::MissingConfig(name.to_string()));
        }

        let api = {
            let mut install = InstallContext::new(name, config, staged);
            plugin
                .install(ctx, &mut install)
                .map_err(|e| PluginError::hook(name, "install", e))?
        };
        if plugin.provides_api() && api.is_none() {
            return Err(PluginError::MissingApi(name.to_string()));
        }

        plugin
            .on_enable(ctx, api.as_ref())
            .map_err(|e| PluginError::hook(name, "enable", e))?;

        if let Some(api) = &api {
            ctx.publish_api(name, Arc::clone(api));
        }

        if let Some(hook) = plugin.ready() {
            hook.on_ready(ctx)
                .map_err(|e| PluginError::hook(name, "ready", e))?;
        }

        plugin
            .on_post_enable(ctx, api.as_ref())
            .map_err(|e| PluginError::hook(name, "post_enable", e))?;

        Ok(api)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    pub fn ensure_enabled(&self, name: &str) -> Result<(), PluginError> {
        if self.is_enabled(name) {
            Ok(())
        } else {
            Err(PluginError::NotEnabled(name.to_string()))
        }
    }

    /// 已启用插件名（按启用顺序）
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// 获取插件 API
    pub fn api<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, PluginError> {
        self.ensure_enabled(name)?;
        self.ctx
            .api::<T>(name)
            .ok_or_else(|| PluginError::MissingApi(name.to_string()))
    }

    pub fn notify_plugins_loaded(&self) -> Result<(), PluginError> {
        for p in &self.plugins {
            p.plugin
                .on_plugins_loaded(&self.ctx)
                .map_err(|e| PluginError::hook(&p.name, "plugins_loaded", e))?;
        }
        Ok(())
    }

    pub fn notify_controllers_loaded(&self, routes: &[RouteDescriptor]) -> Result<(), PluginError> {
        for p in &self.plugins {
            p.plugin
                .on_controllers_loaded(&self.ctx, routes)
                .map_err(|e| PluginError::hook(&p.name, "controllers_loaded", e))?;
        }
        Ok(())
    }

    /// 按启用顺序依次等待异步 ready 钩子
    pub async fn startup(&self) -> Result<(), PluginError> {
        for p in &self.plugins {
            if let Some(hook) = p.plugin.ready_async() {
                tracing::info!("Starting plugin: {}", p.name);
                hook.on_ready_async(&self.ctx)
                    .await
                    .map_err(|e| PluginError::hook(&p.name, "ready_async", e))?;
            }
        }
        Ok(())
    }

    pub fn app_ready(&self) -> Result<(), PluginError> {
        for p in &self.plugins {
            p.plugin
                .on_app_ready(&self.ctx)
                .map_err(|e| PluginError::hook(&p.name, "app_ready", e))?;
        }
        Ok(())
    }

    /// 逆序关闭：每个插件依次执行 before_shutdown（同步、异步）、同步 shutdown、异步 shutdown
    ///
    /// 单个插件失败不会阻止其他插件关闭，返回遇到的第一个错误
    pub async fn shutdown(&self) -> Result<(), PluginError> {
        let mut first_error = None;

        for p in self.plugins.iter().rev() {
            tracing::info!("Shutting down plugin: {}", p.name);
            if let Err(e) = self.shutdown_one(p).await {
                tracing::error!("Failed to shutdown plugin {}: {}", p.name, e);
                first_error.get_or_insert(e);
                continue;
            }
            tracing::info!("Plugin '{}' shutdown complete", p.name);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn shutdown_one(&self, p: &EnabledPlugin) -> Result<(), PluginError> {
        p.plugin
            .on_before_shutdown(&self.ctx)
            .map_err(|e| PluginError::hook(&p.name, "before_shutdown", e))?;
        p.plugin
            .on_before_shutdown_async(&self.ctx)
            .await
            .map_err(|e| PluginError::hook(&p.name, "before_shutdown_async", e))?;

        if let Some(hook) = p.plugin.shutdown() {
            hook.on_shutdown(&self.ctx)
                .map_err(|e| PluginError::hook(&p.name, "shutdown", e))?;
        }
        if let Some(hook) = p.plugin.shutdown_async() {
            hook.on_shutdown_async(&self.ctx)
                .await
                .map_err(|e| PluginError::hook(&p.name, "shutdown_async", e))?;
        }
        Ok(())
    }
}

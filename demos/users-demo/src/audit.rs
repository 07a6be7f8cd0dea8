//! 记录请求路由和生命周期事件的示例插件

use opinio_core::prelude::*;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct AuditConfig {
    #[serde(default)]
    prefix: String,
}

pub struct AuditPlugin;

impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn on_controllers_loaded(&self, ctx: &PluginContext, routes: &[RouteDescriptor]) -> PluginResult<()> {
        for route in routes {
            tracing::info!("[{}] {} {}", ctx.app_name(), route.method(), route.path());
        }
        Ok(())
    }

    fn ready(&self) -> Option<&dyn ReadyHook> {
        Some(self)
    }

    fn shutdown_async(&self) -> Option<&dyn AsyncShutdownHook> {
        Some(self)
    }
}

impl ReadyHook for AuditPlugin {
    fn on_ready(&self, ctx: &PluginContext) -> PluginResult<()> {
        let config: AuditConfig = ctx
            .environment()
            .get_section("plugins.audit")
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        tracing::info!("Audit enabled with prefix '{}'", config.prefix);
        Ok(())
    }
}

#[async_trait]
impl AsyncShutdownHook for AuditPlugin {
    async fn on_shutdown_async(&self, ctx: &PluginContext) -> PluginResult<()> {
        tracing::info!("Audit closed for {}", ctx.app_name());
        Ok(())
    }
}

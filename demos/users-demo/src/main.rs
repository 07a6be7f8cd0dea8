//! Opinio 示例应用
//!
//! 控制器清单由 `build.rs` 扫描 `src/app/domains` 生成

mod app;
mod audit;

include!(concat!(env!("OUT_DIR"), "/manifest.rs"));

use audit::AuditPlugin;
use opinio_core::prelude::*;

#[route(GET, "/health", group = "OPS")]
async fn health() -> &'static str {
    "ok"
}

fn ops_routes(registry: &mut RouteRegistry) -> anyhow::Result<()> {
    registry.register_route(health_route())?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    let lifespan = Lifespan::new()
        .on_startup(|| async {
            tracing::info!("Warming up users demo");
            Ok(())
        })
        .on_shutdown(|| async {
            tracing::info!("Users demo stopped");
            Ok(())
        });

    let options = AppOptions::load("users-demo")?.lifespan(lifespan);
    let mut app = App::create(options, manifest().module("ops", ops_routes));
    app.enable(AuditPlugin)?;

    app.run().await?;
    Ok(())
}

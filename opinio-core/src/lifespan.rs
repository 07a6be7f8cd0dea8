//! 用户提供的启动/关闭钩子

use futures::future::BoxFuture;
use std::future::Future;

type Hook = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 应用生命周期钩子
///
/// 启动钩子在插件异步 ready 之后、`on_app_ready` 之前执行；
/// 关闭钩子在插件关闭之前执行。
#[derive(Default)]
pub struct Lifespan {
    startup: Option<Hook>,
    shutdown: Option<Hook>,
}

impl Lifespan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_startup<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.startup = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub fn on_shutdown<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shutdown = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub(crate) async fn startup(&self) -> anyhow::Result<()> {
        match &self.startup {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }

    pub(crate) async fn shutdown(&self) -> anyhow::Result<()> {
        match &self.shutdown {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Lifespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifespan")
            .field("startup", &self.startup.is_some())
            .field("shutdown", &self.shutdown.is_some())
            .finish()
    }
}

//! 应用装配
//!
//! `App` 持有路由注册表、控制器清单和插件宿主，把它们组装成一个 axum `Router`，
//! 并把插件钩子与用户钩子串成一个启动/关闭序列：
//!
//! ```text
//! create → enable* → router() ─┬─ on_plugins_loaded
//!                              ├─ Discovery::run(manifest)
//!                              ├─ on_controllers_loaded
//!                              └─ 注册到 axum Router
//! run → startup() ─┬─ 插件异步 ready（启用顺序）
//!                  ├─ 用户 startup
//!                  └─ on_app_ready
//!     → axum::serve ... 关闭信号
//!     → shutdown() ─┬─ 用户 shutdown
//!                   └─ 插件关闭（逆序）
//! ```

use crate::config::Environment;
use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX, PLUGIN_CONFIG_PREFIX};
use crate::discovery::{Discovery, Manifest};
use crate::error::{AppError, AppResult};
use crate::lifespan::Lifespan;
use crate::plugin::{EnabledPlugins, Plugin, PluginApi, PluginCatalog, PluginConfig, PluginContext, PluginHost};
use crate::registry::RouteRegistry;
use crate::route::RouteDescriptor;
use crate::server::{self, ServerProperties};
use axum::routing::MethodRouter;
use axum::Router;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

/// 应用选项
///
/// `router` 原样透传给 axum，发现的路由会合并进去。
/// 需要参与冲突检测的路由用 [`AppOptions::route`] 加入注册表。
pub struct AppOptions {
    name: String,
    router: Router,
    routes: Vec<RouteDescriptor>,
    server: Option<ServerProperties>,
    environment: Arc<Environment>,
    lifespan: Lifespan,
}

impl AppOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            router: Router::new(),
            routes: Vec::new(),
            server: None,
            environment: Arc::new(Environment::new()),
            lifespan: Lifespan::new(),
        }
    }

    /// 按约定加载配置
    ///
    /// 读取 `application.toml`、`APP_PROFILES_ACTIVE` 指定的 profile 覆盖文件，
    /// 以及 `APP_` 前缀的环境变量
    pub fn load(name: impl Into<String>) -> AppResult<Self> {
        let profiles: Vec<String> = std::env::var(format!("{}PROFILES_ACTIVE", DEFAULT_ENV_PREFIX))
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if profiles.is_empty() {
            tracing::info!("No active profiles set, using default configuration");
        } else {
            tracing::info!("Active profiles: {:?}", profiles);
        }

        let environment = Environment::load(DEFAULT_CONFIG_FILE, &profiles, DEFAULT_ENV_PREFIX)
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self::new(name).environment(environment))
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// 追加一条路由，和控制器路由一起注册，冲突时 `router()` 返回错误
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    /// 显式指定服务器配置，否则从 Environment 读取
    pub fn server(mut self, server: ServerProperties) -> Self {
        self.server = Some(server);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    pub fn lifespan(mut self, lifespan: Lifespan) -> Self {
        self.lifespan = lifespan;
        self
    }
}

/// 应用
pub struct App {
    name: String,
    base: Router,
    server: ServerProperties,
    lifespan: Lifespan,
    manifest: Manifest,
    /// `AppOptions::route` 提供的路由，在发现之前注册
    extra_routes: Vec<RouteDescriptor>,
    registry: RouteRegistry,
    plugins: PluginHost,
    plugins_loaded: bool,
    /// 装配完成的路由，存在即表示已封闭
    assembled: Option<Router>,
}

impl App {
    /// 创建应用，此时既不启用插件也不执行控制器模块
    pub fn create(options: AppOptions, manifest: Manifest) -> Self {
        let AppOptions {
            name,
            router,
            routes,
            server,
            environment,
            lifespan,
        } = options;

        let server = server.unwrap_or_else(|| ServerProperties::from_environment(&environment));
        let ctx = PluginContext::new(name.clone(), environment);

        tracing::info!("Creating application '{}' ({} controller modules)", name, manifest.len());

        Self {
            name,
            base: router,
            server,
            lifespan,
            manifest,
            extra_routes: routes,
            registry: RouteRegistry::new(),
            plugins: PluginHost::new(ctx),
            plugins_loaded: false,
            assembled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server(&self) -> &ServerProperties {
        &self.server
    }

    pub fn environment(&self) -> &Arc<Environment> {
        self.plugins.context().environment()
    }

    pub fn plugins(&self) -> &PluginHost {
        &self.plugins
    }

    /// 启用插件，配置取自 `[plugins.<name>]`
    pub fn enable<P: Plugin + 'static>(&mut self, plugin: P) -> AppResult<Option<PluginApi>> {
        let plugin: Arc<dyn Plugin> = Arc::new(plugin);
        let config = self.plugin_config(plugin.name());
        self.enable_plugin(plugin, config)
    }

    /// 启用插件并显式提供配置
    pub fn enable_with_config<P: Plugin + 'static>(
        &mut self,
        plugin: P,
        config: serde_json::Value,
    ) -> AppResult<Option<PluginApi>> {
        self.enable_plugin(Arc::new(plugin), PluginConfig::new(config))
    }

    /// 按启用列表文件启用目录中的插件，返回启用的数量
    pub fn load_enabled_plugins(&mut self, catalog: &PluginCatalog, path: impl AsRef<Path>) -> AppResult<usize> {
        let enabled = EnabledPlugins::load(path)?;
        for name in &enabled.enabled {
            let plugin = catalog.create(name)?;
            let config = self.plugin_config(name);
            self.enable_plugin(plugin, config)?;
        }
        Ok(enabled.enabled.len())
    }

    fn plugin_config(&self, name: &str) -> PluginConfig {
        self.environment()
            .get_section(&format!("{}.{}", PLUGIN_CONFIG_PREFIX, name))
            .map(PluginConfig::new)
            .unwrap_or_default()
    }

    fn enable_plugin(&mut self, plugin: Arc<dyn Plugin>, config: PluginConfig) -> AppResult<Option<PluginApi>> {
        if self.assembled.is_some() {
            return Err(AppError::Sealed);
        }
        Ok(self.plugins.enable(plugin, config, &mut self.registry)?)
    }

    /// 获取插件 API
    pub fn api<T: Any + Send + Sync>(&self, plugin: &str) -> AppResult<Arc<T>> {
        Ok(self.plugins.api::<T>(plugin)?)
    }

    /// 装配 axum 路由
    ///
    /// 第一次成功调用时执行控制器发现并通知插件，之后返回缓存结果。
    /// 发现或装配失败时注册表保持调用前的状态，可以再次调用；
    /// `on_plugins_loaded` 只通知一次。
    pub fn router(&mut self) -> AppResult<Router> {
        if let Some(router) = &self.assembled {
            return Ok(router.clone());
        }

        if !self.plugins_loaded {
            self.plugins.notify_plugins_loaded()?;
            self.plugins_loaded = true;
        }

        let mut staged = self.registry.clone();
        for route in &self.extra_routes {
            staged.register_route(route.clone())?;
        }
        Discovery::run(&self.manifest, &mut staged)?;
        self.plugins.notify_controllers_loaded(staged.routes())?;

        let router = assemble(self.base.clone(), staged.routes())?;
        tracing::info!(
            "Registered {} routes from {} controllers",
            staged.len(),
            staged.controllers().len()
        );

        self.registry = staged;
        self.assembled = Some(router.clone());
        Ok(router)
    }

    /// 已收集的路由（插件注册的路由在前，控制器路由在 `router()` 之后出现）
    pub fn routes(&self) -> &[RouteDescriptor] {
        self.registry.routes()
    }

    /// 启动序列：插件异步 ready → 用户 startup → on_app_ready
    pub async fn startup(&self) -> AppResult<()> {
        self.plugins.startup().await?;
        self.lifespan
            .startup()
            .await
            .map_err(|source| AppError::Lifespan {
                stage: "startup",
                source,
            })?;
        self.plugins.app_ready()?;

        tracing::info!("Application '{}' is ready", self.name);
        Ok(())
    }

    /// 关闭序列：用户 shutdown → 插件逆序关闭
    ///
    /// 用户钩子失败不影响插件关闭，返回第一个错误
    pub async fn shutdown(&self) -> AppResult<()> {
        tracing::info!("Shutting down application '{}'", self.name);

        let user = self
            .lifespan
            .shutdown()
            .await
            .map_err(|source| AppError::Lifespan {
                stage: "shutdown",
                source,
            });
        if let Err(e) = &user {
            tracing::error!("{}", e);
        }

        let plugins = self.plugins.shutdown().await.map_err(AppError::from);
        user.and(plugins)
    }

    /// 运行直到 Ctrl+C
    pub async fn run(self) -> AppResult<()> {
        self.run_until(server::shutdown_signal()).await
    }

    /// 运行直到 `signal` 完成
    pub async fn run_until<S>(mut self, signal: S) -> AppResult<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let router = self.router()?;
        self.startup().await?;

        let served = server::serve(router, &self.server, signal).await;
        if let Err(e) = &served {
            tracing::error!("{}", e);
        }
        let stopped = self.shutdown().await;
        served.and(stopped)
    }
}

/// 同一路径的路由合并为一个 `MethodRouter`，按首次出现的顺序挂到 `base` 上
///
/// 注册表已经排除了彼此冲突的路由；`base` 中的路由对注册表不可见，
/// 与之重叠时 axum 会 panic，这里转换为 `AppError::RouteConflict`
fn assemble(base: Router, routes: &[RouteDescriptor]) -> AppResult<Router> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_path: HashMap<&str, MethodRouter> = HashMap::new();

    for route in routes {
        let handler = route.handler().clone();
        match by_path.remove(route.path()) {
            Some(existing) => {
                by_path.insert(route.path(), existing.merge(handler));
            }
            None => {
                order.push(route.path());
                by_path.insert(route.path(), handler);
            }
        }
    }

    let mut router = base;
    for path in order {
        let Some(method_router) = by_path.remove(path) else {
            continue;
        };
        router = std::panic::catch_unwind(AssertUnwindSafe(move || router.route(path, method_router)))
            .map_err(|panic| AppError::RouteConflict {
                path: path.to_string(),
                message: panic_message(panic.as_ref()),
            })?;
    }
    Ok(router)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "route insertion failed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, MapPropertySource};
    use crate::controller::ControllerDescriptor;
    use crate::discovery::DiscoveryError;
    use crate::plugin::{AsyncReadyHook, InstallContext, PluginError, PluginResult};
    use crate::route::HttpMethod;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parking_lot::Mutex;
    use tower::ServiceExt;

    type Log = Arc<Mutex<Vec<String>>>;

    async fn list() -> &'static str {
        "list"
    }

    async fn create() -> &'static str {
        "create"
    }

    async fn root() -> &'static str {
        "root"
    }

    fn items(registry: &mut RouteRegistry) -> anyhow::Result<()> {
        registry.register_controller(
            ControllerDescriptor::new("ItemController", "/items")
                .route(RouteDescriptor::new(HttpMethod::Get, "", "list", list))
                .route(RouteDescriptor::new(HttpMethod::Post, "", "create", create)),
        )?;
        Ok(())
    }

    fn broken(_registry: &mut RouteRegistry) -> anyhow::Result<()> {
        anyhow::bail!("database unavailable")
    }

    async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    struct Tracker {
        log: Log,
    }

    impl Plugin for Tracker {
        fn name(&self) -> &str {
            "tracker"
        }

        fn on_plugins_loaded(&self, _ctx: &PluginContext) -> PluginResult<()> {
            self.log.lock().push("plugins_loaded".into());
            Ok(())
        }

        fn on_controllers_loaded(&self, _ctx: &PluginContext, routes: &[RouteDescriptor]) -> PluginResult<()> {
            self.log.lock().push(format!("controllers_loaded:{}", routes.len()));
            Ok(())
        }

        fn on_app_ready(&self, _ctx: &PluginContext) -> PluginResult<()> {
            self.log.lock().push("app_ready".into());
            Ok(())
        }

        fn ready_async(&self) -> Option<&dyn AsyncReadyHook> {
            Some(self)
        }
    }

    #[async_trait]
    impl AsyncReadyHook for Tracker {
        async fn on_ready_async(&self, _ctx: &PluginContext) -> PluginResult<()> {
            self.log.lock().push("ready_async".into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_router_merges_methods_on_same_path() {
        let mut app = App::create(AppOptions::new("test"), Manifest::new().module("items", items));
        let router = app.router().unwrap();

        assert_eq!(call(&router, "GET", "/items").await, (StatusCode::OK, "list".into()));
        assert_eq!(call(&router, "POST", "/items").await, (StatusCode::OK, "create".into()));
        assert_eq!(call(&router, "DELETE", "/items").await.0, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(call(&router, "GET", "/missing").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_base_router_is_kept() {
        let base = Router::new().route("/", axum::routing::get(root));
        let mut app = App::create(AppOptions::new("test").router(base), Manifest::new().module("items", items));
        let router = app.router().unwrap();

        assert_eq!(call(&router, "GET", "/").await, (StatusCode::OK, "root".into()));
        assert_eq!(call(&router, "GET", "/items").await.1, "list");
    }

    #[test]
    fn test_router_runs_discovery_once_and_seals() {
        let log = Log::default();
        let mut app = App::create(AppOptions::new("test"), Manifest::new().module("items", items));
        app.enable(Tracker { log: Arc::clone(&log) }).unwrap();
        assert!(app.routes().is_empty());

        app.router().unwrap();
        app.router().unwrap();
        assert_eq!(app.routes().len(), 2);
        assert_eq!(
            *log.lock(),
            vec!["plugins_loaded".to_string(), "controllers_loaded:2".to_string()]
        );

        let err = app.enable(Tracker { log }).unwrap_err();
        assert!(matches!(err, AppError::Sealed));
    }

    #[test]
    fn test_discovery_failure_names_module() {
        let manifest = Manifest::new()
            .module("items", items)
            .module("app::domains::orders::controllers::order_controller", broken);
        let mut app = App::create(AppOptions::new("test"), manifest);

        match app.router() {
            Err(AppError::Discovery(DiscoveryError::Module { module, .. })) => {
                assert_eq!(module, "app::domains::orders::controllers::order_controller");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failed_discovery_can_be_retried_without_duplicates() {
        let log = Log::default();
        let manifest = Manifest::new().module("items", items).module("broken", broken);
        let mut app = App::create(AppOptions::new("test"), manifest);
        app.enable(Tracker { log: Arc::clone(&log) }).unwrap();

        for _ in 0..2 {
            let err = app.router().unwrap_err();
            assert!(err.to_string().contains("database unavailable"), "{}", err);
            assert!(app.routes().is_empty());
        }
        assert_eq!(*log.lock(), vec!["plugins_loaded".to_string()]);

        // 失败的装配不会封闭应用
        let err = app.enable(Tracker { log }).unwrap_err();
        assert!(matches!(err, AppError::Plugin(PluginError::AlreadyEnabled(_))));
    }

    async fn show() -> &'static str {
        "show"
    }

    fn items_by_id(registry: &mut RouteRegistry) -> anyhow::Result<()> {
        registry.register_route(RouteDescriptor::new(HttpMethod::Get, "/items/:id", "show", show))?;
        registry.register_route(RouteDescriptor::new(HttpMethod::Delete, "/items/:item_id", "remove", show))?;
        Ok(())
    }

    #[test]
    fn test_param_name_conflict_is_an_error() {
        let mut app = App::create(AppOptions::new("test"), Manifest::new().module("items", items_by_id));

        let err = app.router().unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
        assert!(err.to_string().contains("parameter names differ"), "{}", err);
    }

    #[test]
    fn test_base_router_overlap_is_an_error() {
        let base = Router::new().route("/items", axum::routing::get(root));
        let mut app = App::create(AppOptions::new("test").router(base), Manifest::new().module("items", items));

        match app.router() {
            Err(AppError::RouteConflict { path, .. }) => assert_eq!(path, "/items"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(app.routes().is_empty());
    }

    #[tokio::test]
    async fn test_option_routes_go_through_registry() {
        let options = AppOptions::new("test").route(RouteDescriptor::new(HttpMethod::Get, "/", "root", root));
        let mut app = App::create(options, Manifest::new().module("items", items));
        let router = app.router().unwrap();
        assert_eq!(call(&router, "GET", "/").await, (StatusCode::OK, "root".into()));
        assert_eq!(app.routes().len(), 3);

        let options = AppOptions::new("test").route(RouteDescriptor::new(HttpMethod::Get, "/items", "root", root));
        let mut app = App::create(options, Manifest::new().module("items", items));
        let err = app.router().unwrap_err();
        assert!(err.to_string().contains("duplicate route GET /items"), "{}", err);
    }

    #[tokio::test]
    async fn test_startup_order() {
        let log = Log::default();
        let lifespan_log = Arc::clone(&log);
        let lifespan = Lifespan::new().on_startup(move || {
            let log = Arc::clone(&lifespan_log);
            async move {
                log.lock().push("user_startup".into());
                Ok(())
            }
        });

        let mut app = App::create(AppOptions::new("test").lifespan(lifespan), Manifest::new());
        app.enable(Tracker { log: Arc::clone(&log) }).unwrap();
        app.router().unwrap();
        log.lock().clear();

        app.startup().await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["ready_async".to_string(), "user_startup".to_string(), "app_ready".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failing_user_startup_aborts() {
        let log = Log::default();
        let lifespan = Lifespan::new().on_startup(|| async { anyhow::bail!("migrations failed") });
        let mut app = App::create(AppOptions::new("test").lifespan(lifespan), Manifest::new());
        app.enable(Tracker { log: Arc::clone(&log) }).unwrap();

        let err = app.startup().await.unwrap_err();
        assert!(matches!(err, AppError::Lifespan { stage: "startup", .. }));
        assert!(!log.lock().contains(&"app_ready".to_string()));
    }

    struct Health;

    #[derive(serde::Deserialize)]
    struct HealthConfig {
        path: String,
    }

    impl Plugin for Health {
        fn name(&self) -> &str {
            "health"
        }

        fn requires_config(&self) -> bool {
            true
        }

        fn install(&self, _ctx: &PluginContext, install: &mut InstallContext<'_>) -> PluginResult<Option<PluginApi>> {
            let config: HealthConfig = install.config().parse()?;
            install.register_route(RouteDescriptor::new(HttpMethod::Get, config.path, "health", root))?;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_plugin_config_comes_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("plugins.health.path", ConfigValue::String("/healthz".into())),
        ));
        let mut app = App::create(AppOptions::new("test").environment(env), Manifest::new());
        app.enable(Health).unwrap();

        let router = app.router().unwrap();
        assert_eq!(call(&router, "GET", "/healthz").await, (StatusCode::OK, "root".into()));
    }

    #[test]
    fn test_load_enabled_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.toml");
        std::fs::write(&path, "enabled = [\"health\"]\n").unwrap();

        let mut catalog = PluginCatalog::new();
        catalog.register("health", || Health);

        let mut app = App::create(AppOptions::new("test"), Manifest::new());
        let err = app.load_enabled_plugins(&catalog, &path).unwrap_err();
        assert!(matches!(err, AppError::Plugin(PluginError::MissingConfig(_))));

        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("plugins.health.path", ConfigValue::String("/up".into())),
        ));
        let mut app = App::create(AppOptions::new("test").environment(env), Manifest::new());
        assert_eq!(app.load_enabled_plugins(&catalog, &path).unwrap(), 1);
        assert_eq!(app.plugins().names(), vec!["health"]);
    }

    #[tokio::test]
    async fn test_run_until_runs_full_lifecycle() {
        let log = Log::default();
        let shutdown_log = Arc::clone(&log);
        let lifespan = Lifespan::new().on_shutdown(move || {
            let log = Arc::clone(&shutdown_log);
            async move {
                log.lock().push("user_shutdown".into());
                Ok(())
            }
        });
        let server = ServerProperties {
            host: "127.0.0.1".into(),
            port: 0,
            enable_cors: true,
            enable_request_logging: true,
        };

        let mut app = App::create(
            AppOptions::new("test").server(server).lifespan(lifespan),
            Manifest::new().module("items", items),
        );
        app.enable(Tracker { log: Arc::clone(&log) }).unwrap();
        app.run_until(async {}).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "plugins_loaded".to_string(),
                "controllers_loaded:2".to_string(),
                "ready_async".to_string(),
                "app_ready".to_string(),
                "user_shutdown".to_string(),
            ]
        );
    }
}

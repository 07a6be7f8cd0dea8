//! 框架配置常量定义
//!
//! 定义框架使用的配置键名称和目录约定

// ==================== Server 配置 ====================

/// 服务器监听地址
pub const SERVER_HOST: &str = "server.host";

/// 服务器监听端口
pub const SERVER_PORT: &str = "server.port";

/// 是否启用 CORS
pub const SERVER_ENABLE_CORS: &str = "server.enable-cors";

/// 是否启用请求日志
pub const SERVER_ENABLE_REQUEST_LOGGING: &str = "server.enable-request-logging";

// ==================== 应用配置 ====================

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// 插件配置段前缀，例如 `[plugins.socket]`
pub const PLUGIN_CONFIG_PREFIX: &str = "plugins";

// ==================== 目录约定 ====================

/// 领域目录（相对于 crate 的 `src/`）
pub const DOMAINS_DIR: &str = "app/domains";

/// 领域内的控制器目录
pub const CONTROLLERS_DIR: &str = "controllers";

/// 领域内的服务目录
pub const SERVICES_DIR: &str = "services";

/// 控制器模块必须导出的注册函数名
pub const ROUTES_FN: &str = "routes";

/// 已启用插件清单文件
pub const ENABLED_PLUGINS_FILE: &str = ".opinio/plugins.toml";

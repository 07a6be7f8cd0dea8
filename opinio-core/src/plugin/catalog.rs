//! 插件目录与启用列表
//!
//! `PluginCatalog` 把插件名映射到构造函数；`EnabledPlugins` 是保存在
//! `.opinio/plugins.toml` 里的启用列表，由 CLI 维护、应用启动时读取。

use super::{Plugin, PluginError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

type PluginFactory = Box<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// 可用插件目录
#[derive(Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册插件构造函数，同名覆盖
    pub fn register<F, P>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Plugin + 'static,
    {
        self.factories
            .insert(name.into(), Box::new(move || Arc::new(factory()) as Arc<dyn Plugin>));
        self
    }

    pub fn create(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PluginError::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 目录中的插件名（已排序）
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.names())
            .finish()
    }
}

/// 启用列表文件
///
/// ```toml
/// enabled = ["socket", "metrics"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledPlugins {
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl EnabledPlugins {
    /// 读取启用列表，文件不存在时返回空列表
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| PluginError::EnabledFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| PluginError::EnabledFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// 排序去重后写回，必要时创建父目录
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PluginError> {
        let path = path.as_ref();
        let file_error = |message: String| PluginError::EnabledFile {
            path: path.to_path_buf(),
            message,
        };

        let mut normalized = self.clone();
        normalized.enabled.sort();
        normalized.enabled.dedup();

        let content = toml::to_string(&normalized).map_err(|e| file_error(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| file_error(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| file_error(e.to_string()))
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| n == name)
    }

    /// 返回是否有变化
    pub fn enable(&mut self, name: &str) -> bool {
        if self.is_enabled(name) {
            return false;
        }
        self.enabled.push(name.to_string());
        true
    }

    /// 返回是否有变化
    pub fn disable(&mut self, name: &str) -> bool {
        let before = self.enabled.len();
        self.enabled.retain(|n| n != name);
        self.enabled.len() != before
    }
}

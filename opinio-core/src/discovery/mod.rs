//! 控制器发现
//!
//! 运行时不做文件系统反射：控制器模块通过 `Manifest` 显式列出，
//! 清单可以手写，也可以由 [`scan`] 在构建期按 `app/domains/*/controllers/` 约定生成。

pub mod scan;

use crate::registry::RouteRegistry;
use std::collections::HashSet;
use thiserror::Error;

/// 控制器模块的注册函数
pub type RegisterFn = fn(&mut RouteRegistry) -> anyhow::Result<()>;

/// 清单中的一个控制器模块
#[derive(Clone, Copy)]
pub struct ModuleEntry {
    /// 模块路径，例如 `app::domains::users::controllers::user_controller`
    pub module_path: &'static str,
    pub register: RegisterFn,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("module_path", &self.module_path)
            .finish_non_exhaustive()
    }
}

/// 控制器模块清单
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ModuleEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个模块
    pub fn module(mut self, module_path: &'static str, register: RegisterFn) -> Self {
        self.entries.push(ModuleEntry {
            module_path,
            register,
        });
        self
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 发现错误
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// 某个控制器模块注册失败，之前模块注册的路由保留在注册表中
    #[error("failed to load controller module '{module}': {source}")]
    Module {
        module: String,
        #[source]
        source: anyhow::Error,
    },
}

/// 一次发现的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// 实际执行的模块数
    pub modules: usize,
    /// 新增的路由数
    pub routes: usize,
}

/// 按清单执行控制器注册
pub struct Discovery;

impl Discovery {
    /// 依次执行清单中每个模块的注册函数
    ///
    /// - 同一模块路径只执行一次，重复项跳过并告警
    /// - 遇到第一个失败的模块立即返回，错误中带模块路径
    pub fn run(manifest: &Manifest, registry: &mut RouteRegistry) -> Result<DiscoveryReport, DiscoveryError> {
        tracing::info!("🔍 Discovering controllers from {} module(s)", manifest.len());

        let before = registry.len();
        let mut seen = HashSet::new();
        let mut modules = 0;

        for entry in manifest.entries() {
            if !seen.insert(entry.module_path) {
                tracing::warn!("Controller module '{}' listed twice, skipping", entry.module_path);
                continue;
            }

            let start = registry.len();
            (entry.register)(registry).map_err(|source| DiscoveryError::Module {
                module: entry.module_path.to_string(),
                source,
            })?;
            modules += 1;

            tracing::debug!(
                "Loaded controller module '{}' ({} routes)",
                entry.module_path,
                registry.len() - start
            );
        }

        let report = DiscoveryReport {
            modules,
            routes: registry.len() - before,
        };
        tracing::info!(
            "✅ Controller discovery completed: {} modules, {} routes",
            report.modules,
            report.routes
        );
        Ok(report)
    }
}

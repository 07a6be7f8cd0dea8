//! `opinio plugins list|enable|disable|publish`

use anyhow::{bail, Context, Result};
use opinio_core::constants::{DOMAINS_DIR, ENABLED_PLUGINS_FILE};
use opinio_core::discovery::scan::is_module_name;
use opinio_core::plugin::EnabledPlugins;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 插件发布描述文件名
pub const PUBLISH_FILE: &str = "publish.toml";

fn validate_plugin_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z][a-z0-9_-]*$")?;
    if !pattern.is_match(name) {
        bail!("invalid plugin name '{}'", name);
    }
    Ok(())
}

fn enabled_file(root: &Path) -> PathBuf {
    root.join(ENABLED_PLUGINS_FILE)
}

pub fn list(root: &Path) -> Result<()> {
    let enabled = EnabledPlugins::load(enabled_file(root))?;
    if enabled.enabled.is_empty() {
        println!("No plugins enabled.");
        return Ok(());
    }
    for name in &enabled.enabled {
        println!("{}", name);
    }
    Ok(())
}

pub fn enable(root: &Path, name: &str) -> Result<()> {
    validate_plugin_name(name)?;
    let path = enabled_file(root);
    let mut enabled = EnabledPlugins::load(&path)?;
    if enabled.enable(name) {
        enabled.save(&path)?;
        println!("Plugin '{}' enabled.", name);
    } else {
        println!("Plugin '{}' is already enabled.", name);
    }
    Ok(())
}

pub fn disable(root: &Path, name: &str) -> Result<()> {
    validate_plugin_name(name)?;
    let path = enabled_file(root);
    let mut enabled = EnabledPlugins::load(&path)?;
    if enabled.disable(name) {
        enabled.save(&path)?;
        println!("Plugin '{}' disabled.", name);
    } else {
        println!("Plugin '{}' is not enabled.", name);
    }
    Ok(())
}

/// `publish.toml`
///
/// ```toml
/// name = "socket"
/// domain = "socket"
/// overwrite = false
///
/// [overwrite_rules]
/// "controllers/socket_controller.rs" = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PublishMetadata {
    pub name: String,
    /// 目标领域，文件复制到 `src/app/domains/<domain>/`
    pub domain: String,
    #[serde(default)]
    pub overwrite: bool,
    /// 逐个文件允许覆盖，键为相对路径或文件名
    #[serde(default)]
    pub overwrite_rules: BTreeMap<String, bool>,
    #[serde(default = "default_publish_dir")]
    pub publish_dir: String,
}

fn default_publish_dir() -> String {
    "publish".to_string()
}

impl PublishMetadata {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(PUBLISH_FILE);
        let content =
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))
    }

    /// `force`、`overwrite = true` 或匹配规则为 `true` 时允许覆盖
    ///
    /// 规则键可以是相对路径（`controllers/socket_controller.rs`）或文件名（`config.toml`）
    fn may_overwrite(&self, rel: &str, force: bool) -> bool {
        let file_name = rel.rsplit('/').next().unwrap_or(rel);
        force
            || self.overwrite
            || self.overwrite_rules.get(rel) == Some(&true)
            || self.overwrite_rules.get(file_name) == Some(&true)
    }
}

/// 发布结果
#[derive(Debug, Default)]
pub struct PublishSummary {
    pub copied: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl PublishSummary {
    pub fn print(&self, root: &Path) {
        for path in &self.copied {
            println!("  copied  {}", path.strip_prefix(root).unwrap_or(path).display());
        }
        for path in &self.skipped {
            println!("  skipped {} (exists)", path.strip_prefix(root).unwrap_or(path).display());
        }
        println!("{} file(s) copied, {} skipped.", self.copied.len(), self.skipped.len());
    }
}

/// 启用插件并立即发布它的文件
///
/// `publish.toml` 中的插件名必须与 `name` 一致，校验通过后才写入启用列表
pub fn enable_and_publish(root: &Path, name: &str, dir: &Path, force: bool) -> Result<PublishSummary> {
    let metadata = PublishMetadata::load(dir)?;
    if metadata.name != name {
        bail!(
            "{} describes plugin '{}', not '{}'",
            dir.join(PUBLISH_FILE).display(),
            metadata.name,
            name
        );
    }
    enable(root, name)?;
    publish(root, dir, force)
}

/// 把插件的可发布文件复制到项目领域目录
///
/// 插件必须已启用；已存在的文件默认跳过
pub fn publish(root: &Path, dir: &Path, force: bool) -> Result<PublishSummary> {
    let metadata = PublishMetadata::load(dir)?;
    validate_plugin_name(&metadata.name)?;
    if !is_module_name(&metadata.domain) {
        bail!("invalid domain '{}' in {}", metadata.domain, PUBLISH_FILE);
    }

    let enabled = EnabledPlugins::load(enabled_file(root))?;
    if !enabled.is_enabled(&metadata.name) {
        bail!(
            "plugin '{}' is not enabled; run `opinio plugins enable {}` first",
            metadata.name,
            metadata.name
        );
    }

    let source_root = dir.join(&metadata.publish_dir);
    if !source_root.is_dir() {
        bail!("nothing to publish: {} does not exist", source_root.display());
    }
    let target_root = root.join("src").join(DOMAINS_DIR).join(&metadata.domain);

    let mut summary = PublishSummary::default();
    for entry in WalkDir::new(&source_root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", source_root.display()))?;
        if !entry.file_type().is_file() || entry.file_name() == PUBLISH_FILE {
            continue;
        }

        let rel = entry.path().strip_prefix(&source_root)?;
        let rel_key = rel
            .iter()
            .map(|c| c.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let target = target_root.join(rel);

        if target.exists() && !metadata.may_overwrite(&rel_key, force) {
            tracing::debug!("Skipping existing {}", target.display());
            summary.skipped.push(target);
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(entry.path(), &target)
            .with_context(|| format!("failed to copy {} to {}", entry.path().display(), target.display()))?;
        summary.copied.push(target);
    }

    tracing::info!(
        "Published plugin '{}': {} copied, {} skipped",
        metadata.name,
        summary.copied.len(),
        summary.skipped.len()
    );
    Ok(summary)
}

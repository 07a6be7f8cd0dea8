//! `opinio manifest`

use anyhow::{Context, Result};
use opinio_core::discovery::scan::write_manifest;
use std::path::{Path, PathBuf};

/// 扫描 `src/app/domains` 写出清单，返回输出路径和模块数
///
/// 默认扫描 `<root>/src`，写到 `<root>/src/manifest.rs`
pub fn generate(root: &Path, src: Option<PathBuf>, out: Option<PathBuf>) -> Result<(PathBuf, usize)> {
    let src = src.unwrap_or_else(|| root.join("src"));
    let out = out.unwrap_or_else(|| root.join("src").join("manifest.rs"));

    let count = write_manifest(&src, &out)
        .with_context(|| format!("failed to generate manifest from {}", src.display()))?;
    tracing::info!("Manifest lists {} controller module(s)", count);

    Ok((out, count))
}

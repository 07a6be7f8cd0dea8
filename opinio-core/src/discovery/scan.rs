//! 构建期控制器扫描
//!
//! 按目录约定查找控制器模块并生成 `Manifest` 源码：
//!
//! ```text
//! src/
//! └── app/domains/
//!     └── users/
//!         └── controllers/
//!             ├── mod.rs              (跳过)
//!             └── user_controller.rs  -> app::domains::users::controllers::user_controller
//! ```
//!
//! 每个控制器模块需要导出 `pub fn routes(registry: &mut RouteRegistry) -> anyhow::Result<()>`。
//!
//! 在 `build.rs` 中使用：
//!
//! ```ignore
//! fn main() {
//!     let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("manifest.rs");
//!     opinio_core::discovery::scan::write_manifest("src", &out).unwrap();
//!     println!("cargo:rerun-if-changed=src/app/domains");
//! }
//! ```

use crate::constants::{CONTROLLERS_DIR, DOMAINS_DIR, ROUTES_FN};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// 扫描错误
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to walk {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 文件名或目录名不是合法的 Rust 模块名
    #[error("{path:?} is not a valid Rust module name")]
    InvalidModuleName { path: PathBuf },
}

/// 扫描到的控制器模块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerModule {
    /// 所属领域
    pub domain: String,
    /// 相对 `src/` 的文件路径
    pub file: PathBuf,
    /// Rust 模块路径（不含 `crate::`）
    pub module_path: String,
}

/// 扫描 `<src_root>/app/domains/*/controllers/` 下的控制器模块
///
/// 领域目录不存在或为空时返回空列表。结果按路径排序，保证生成的清单稳定。
pub fn scan_domains(src_root: impl AsRef<Path>) -> Result<Vec<ControllerModule>, ScanError> {
    let src_root = src_root.as_ref();
    let domains_root = src_root.join(DOMAINS_DIR);
    if !domains_root.is_dir() {
        tracing::debug!("No domains directory at {}", domains_root.display());
        return Ok(Vec::new());
    }

    let mut modules = Vec::new();
    let walker = WalkDir::new(&domains_root)
        .min_depth(3)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: domains_root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some("mod.rs") {
            continue;
        }

        let rel = match path.strip_prefix(&domains_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let mut components: Vec<String> = rel
            .iter()
            .map(|c| c.to_string_lossy().to_string())
            .collect();
        // <domain>/controllers/<...>.rs
        if components.len() < 3 || components[1] != CONTROLLERS_DIR {
            continue;
        }
        if let Some(last) = components.last_mut() {
            *last = last.trim_end_matches(".rs").to_string();
        }
        if !components.iter().all(|c| is_module_name(c)) {
            return Err(ScanError::InvalidModuleName {
                path: path.to_path_buf(),
            });
        }

        let module_path = format!("{}::{}", DOMAINS_DIR.replace('/', "::"), components.join("::"));
        let file = path.strip_prefix(src_root).unwrap_or(path).to_path_buf();
        tracing::debug!("Found controller module {}", module_path);

        modules.push(ControllerModule {
            domain: components[0].clone(),
            file,
            module_path,
        });
    }

    Ok(modules)
}

/// Rust 关键字和保留字，不能作为模块名
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// 是否为合法的 Rust 模块名（snake_case 标识符，且不是关键字）
pub fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name != "_"
        && !is_keyword(name)
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// 生成清单源码
pub fn render_manifest(modules: &[ControllerModule]) -> String {
    let mut out = String::new();
    out.push_str("// @generated by opinio. Do not edit by hand.\n\n");
    out.push_str("/// 控制器模块清单\n");
    out.push_str("pub fn manifest() -> ::opinio_core::Manifest {\n");
    out.push_str("    ::opinio_core::Manifest::new()");
    for module in modules {
        out.push_str(&format!(
            "\n        .module(\"{path}\", crate::{path}::{routes})",
            path = module.module_path,
            routes = ROUTES_FN
        ));
    }
    out.push_str("\n}\n");
    out
}

/// 扫描并写出清单文件，返回模块数
///
/// 内容未变化时不重写文件，避免触发无意义的重新编译
pub fn write_manifest(src_root: impl AsRef<Path>, out_file: impl AsRef<Path>) -> Result<usize, ScanError> {
    let modules = scan_domains(src_root)?;
    let rendered = render_manifest(&modules);
    let out_file = out_file.as_ref();

    if fs::read_to_string(out_file).ok().as_deref() == Some(rendered.as_str()) {
        return Ok(modules.len());
    }

    if let Some(parent) = out_file.parent() {
        fs::create_dir_all(parent).map_err(|source| ScanError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(out_file, rendered).map_err(|source| ScanError::Io {
        path: out_file.to_path_buf(),
        source,
    })?;

    Ok(modules.len())
}

//! 子命令实现

pub mod manifest;
pub mod new;
pub mod plugins;
pub mod templates;

use anyhow::{bail, Context, Result};
use opinio_core::discovery::scan::is_keyword;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// 校验 snake_case 名称（领域名、模块名）
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z][a-z0-9_]*$")?;
    if !pattern.is_match(name) {
        bail!(
            "invalid {} name '{}': use lowercase letters, digits and underscores, starting with a letter",
            kind,
            name
        );
    }
    if is_keyword(name) {
        bail!("invalid {} name '{}': it is a Rust keyword", kind, name);
    }
    Ok(())
}

/// 写入新文件，文件已存在时报错
pub fn write_new_file(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        bail!("{} already exists, refusing to overwrite", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!("Created {}", path.display());
    Ok(())
}

/// 确保 `mod.rs` 中声明了 `pub mod <module>;`，返回是否修改了文件
pub fn ensure_mod_line(mod_file: &Path, module: &str) -> Result<bool> {
    let line = format!("pub mod {};", module);
    let existing = if mod_file.exists() {
        fs::read_to_string(mod_file).with_context(|| format!("failed to read {}", mod_file.display()))?
    } else {
        String::new()
    };

    if existing.lines().any(|l| l.trim() == line) {
        return Ok(false);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&line);
    content.push('\n');

    if let Some(parent) = mod_file.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(mod_file, content).with_context(|| format!("failed to write {}", mod_file.display()))?;
    tracing::debug!("Linked module '{}' in {}", module, mod_file.display());
    Ok(true)
}

pub fn print_created(root: &Path, created: &[PathBuf]) {
    for path in created {
        let shown = path.strip_prefix(root).unwrap_or(path);
        println!("  created {}", shown.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("domain", "users").is_ok());
        assert!(validate_name("domain", "user_profile2").is_ok());
        assert!(validate_name("domain", "Users").is_err());
        assert!(validate_name("domain", "user-profile").is_err());
        assert!(validate_name("domain", "2fa").is_err());
        assert!(validate_name("domain", "").is_err());
    }

    #[test]
    fn test_validate_name_rejects_keywords() {
        for keyword in ["type", "mod", "fn", "self", "crate", "super", "async"] {
            assert!(validate_name("domain", keyword).is_err(), "{}", keyword);
        }
        assert!(validate_name("domain", "types").is_ok());
    }

    #[test]
    fn test_ensure_mod_line_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("domains/mod.rs");

        assert!(ensure_mod_line(&file, "users").unwrap());
        assert!(!ensure_mod_line(&file, "users").unwrap());
        assert!(ensure_mod_line(&file, "orders").unwrap());

        assert_eq!(fs::read_to_string(&file).unwrap(), "pub mod users;\npub mod orders;\n");
    }

    #[test]
    fn test_write_new_file_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b.rs");

        write_new_file(&file, "first").unwrap();
        assert!(write_new_file(&file, "second").is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "first");
    }
}

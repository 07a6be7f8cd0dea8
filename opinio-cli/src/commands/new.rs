//! `opinio new domain|controller`

use super::templates::{self, CONTROLLER, CRUD_CONTROLLER, DOMAIN_MOD, SERVICE};
use super::{ensure_mod_line, validate_name, write_new_file};
use anyhow::{bail, Result};
use opinio_core::constants::{CONTROLLERS_DIR, DOMAINS_DIR, SERVICES_DIR};
use std::path::{Path, PathBuf};

fn domains_root(root: &Path) -> PathBuf {
    root.join("src").join(DOMAINS_DIR)
}

/// 创建领域骨架并挂到 `app/domains/mod.rs`，返回新建的文件
pub fn new_domain(root: &Path, name: &str, bootstrap: bool) -> Result<Vec<PathBuf>> {
    validate_name("domain", name)?;

    let domains = domains_root(root);
    let domain_dir = domains.join(name);
    if domain_dir.exists() {
        bail!("domain '{}' already exists at {}", name, domain_dir.display());
    }

    let mut created = Vec::new();
    for (path, content) in [
        (domain_dir.join("mod.rs"), DOMAIN_MOD),
        (domain_dir.join(CONTROLLERS_DIR).join("mod.rs"), ""),
        (domain_dir.join(SERVICES_DIR).join("mod.rs"), ""),
    ] {
        write_new_file(&path, content)?;
        created.push(path);
    }

    ensure_mod_line(&root.join("src/app/mod.rs"), "domains")?;
    ensure_mod_line(&domains.join("mod.rs"), name)?;

    if bootstrap {
        created.extend(new_controller(root, name, false)?);

        let service_module = format!("{}_service", name);
        let service = domain_dir.join(SERVICES_DIR).join(format!("{}.rs", service_module));
        write_new_file(&service, &templates::render(SERVICE, name))?;
        ensure_mod_line(&domain_dir.join(SERVICES_DIR).join("mod.rs"), &service_module)?;
        created.push(service);
    }

    tracing::info!("Created domain '{}'", name);
    Ok(created)
}

/// 在已有领域中创建 `<domain>_controller.rs`
pub fn new_controller(root: &Path, domain: &str, crud: bool) -> Result<Vec<PathBuf>> {
    validate_name("domain", domain)?;

    let domain_dir = domains_root(root).join(domain);
    if !domain_dir.is_dir() {
        bail!(
            "domain '{}' does not exist; create it first with `opinio new domain {}`",
            domain,
            domain
        );
    }

    let module = format!("{}_controller", domain);
    let controllers = domain_dir.join(CONTROLLERS_DIR);
    let file = controllers.join(format!("{}.rs", module));
    let template = if crud { CRUD_CONTROLLER } else { CONTROLLER };

    write_new_file(&file, &templates::render(template, domain))?;
    ensure_mod_line(&controllers.join("mod.rs"), &module)?;

    tracing::info!("Created controller {}", module);
    Ok(vec![file])
}

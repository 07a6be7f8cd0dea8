use opinio_core::discovery::scan::{render_manifest, scan_domains, write_manifest};
use opinio_core::prelude::*;
use opinio_core::Discovery;
use std::fs;

#[test]
fn empty_folder_yields_no_routes() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("app/domains")).unwrap();

    let modules = scan_domains(dir.path()).unwrap();
    assert!(modules.is_empty());

    let mut registry = RouteRegistry::new();
    let report = Discovery::run(&Manifest::new(), &mut registry).unwrap();
    assert_eq!(report.modules, 0);
    assert_eq!(report.routes, 0);
    assert!(registry.is_empty());
}

#[test]
fn generated_manifest_lists_controller_modules() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    for file in [
        "app/domains/users/controllers/mod.rs",
        "app/domains/users/controllers/user_controller.rs",
        "app/domains/users/services/user_service.rs",
        "app/domains/orders/controllers/order_controller.rs",
    ] {
        let path = src.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    let out = dir.path().join("manifest.rs");
    assert_eq!(write_manifest(&src, &out).unwrap(), 2);

    let generated = fs::read_to_string(&out).unwrap();
    assert_eq!(generated, render_manifest(&scan_domains(&src).unwrap()));
    let orders = generated.find("order_controller::routes").unwrap();
    let users = generated.find("user_controller::routes").unwrap();
    assert!(orders < users);
    assert!(!generated.contains("user_service"));
}

pub struct OrderController;

#[controller("/orders", group = "ORDERS")]
impl OrderController {
    #[get("/")]
    async fn list_orders(&self) -> &'static str {
        "[]"
    }

    #[post("/")]
    async fn create_order(&self) -> &'static str {
        "created"
    }
}

fn order_routes(registry: &mut RouteRegistry) -> anyhow::Result<()> {
    registry.controller(OrderController)?;
    Ok(())
}

#[test]
fn module_listed_twice_registers_once() {
    let manifest = Manifest::new()
        .module("app::domains::orders::controllers::order_controller", order_routes)
        .module("app::domains::orders::controllers::order_controller", order_routes);

    let mut registry = RouteRegistry::new();
    let report = Discovery::run(&manifest, &mut registry).unwrap();

    assert_eq!(report.modules, 1);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.groups().into_iter().collect::<Vec<_>>(), vec!["ORDERS"]);
}

//! 脚手架模板
//!
//! 占位符：`__name__`（snake_case）、`__Name__`（PascalCase）、`__GROUP__`（大写分组）

pub const DOMAIN_MOD: &str = "pub mod controllers;\npub mod services;\n";

pub const CONTROLLER: &str = r#"use opinio_core::prelude::*;

#[derive(Default)]
pub struct __Name__Controller;

#[controller("/__name__", group = "__GROUP__")]
impl __Name__Controller {
    #[get("/")]
    async fn list___name__(&self) -> Json<Vec<String>> {
        Json(Vec::new())
    }
}

pub fn routes(registry: &mut RouteRegistry) -> opinio_core::anyhow::Result<()> {
    registry.controller(__Name__Controller::default())?;
    Ok(())
}
"#;

pub const CRUD_CONTROLLER: &str = r#"use opinio_core::prelude::*;

#[derive(Default)]
pub struct __Name__Controller;

#[controller("/__name__", group = "__GROUP__")]
impl __Name__Controller {
    #[get("/")]
    async fn list___name__(&self) -> Json<Vec<String>> {
        Json(Vec::new())
    }

    #[get("/:id")]
    async fn get___name__(&self, Path(id): Path<u64>) -> String {
        id.to_string()
    }

    #[post("/")]
    async fn create___name__(&self, body: String) -> (StatusCode, String) {
        (StatusCode::CREATED, body)
    }

    #[put("/:id")]
    async fn update___name__(&self, Path(_id): Path<u64>, _body: String) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    #[delete("/:id")]
    async fn delete___name__(&self, Path(_id): Path<u64>) -> StatusCode {
        StatusCode::NO_CONTENT
    }
}

pub fn routes(registry: &mut RouteRegistry) -> opinio_core::anyhow::Result<()> {
    registry.controller(__Name__Controller::default())?;
    Ok(())
}
"#;

pub const SERVICE: &str = r#"/// __Name__ domain service
#[derive(Debug, Default, Clone)]
pub struct __Name__Service;

impl __Name__Service {
    pub fn new() -> Self {
        Self
    }
}
"#;

/// 用领域名填充模板
pub fn render(template: &str, name: &str) -> String {
    template
        .replace("__Name__", &pascal_case(name))
        .replace("__GROUP__", &name.to_uppercase())
        .replace("__name__", name)
}

/// user_profile -> UserProfile
pub fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("users"), "Users");
        assert_eq!(pascal_case("user_profile"), "UserProfile");
        assert_eq!(pascal_case("v2_api"), "V2Api");
    }

    #[test]
    fn test_render_controller() {
        let source = render(CONTROLLER, "user_profile");
        assert!(source.contains("pub struct UserProfileController;"));
        assert!(source.contains("#[controller(\"/user_profile\", group = \"USER_PROFILE\")]"));
        assert!(source.contains("async fn list_user_profile(&self)"));
        assert!(source.contains("registry.controller(UserProfileController::default())?;"));
        assert!(!source.contains("__"));
    }

    #[test]
    fn test_render_crud_controller_has_all_handlers() {
        let source = render(CRUD_CONTROLLER, "orders");
        for handler in ["list_orders", "get_orders", "create_orders", "update_orders", "delete_orders"] {
            assert!(source.contains(&format!("async fn {}(", handler)), "missing {}", handler);
        }
    }
}

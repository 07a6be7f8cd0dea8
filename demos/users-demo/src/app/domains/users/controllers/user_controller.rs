use crate::app::domains::users::services::user_service::{NewUser, User, UserService};
use opinio_core::prelude::*;

pub struct UserController {
    service: UserService,
}

#[controller("/users", group = "USERS")]
impl UserController {
    #[get("/")]
    async fn list_users(&self) -> Json<Vec<User>> {
        Json(self.service.list())
    }

    #[get("/:id")]
    async fn get_user(&self, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
        self.service.get(id).map(Json).ok_or(StatusCode::NOT_FOUND)
    }

    #[post("/", group = "ADMIN")]
    async fn create_user(&self, Json(new_user): Json<NewUser>) -> (StatusCode, Json<User>) {
        let user = self.service.create(new_user);
        tracing::info!("Created user {}", user.id);
        (StatusCode::CREATED, Json(user))
    }

    #[delete("/:id", group = "ADMIN")]
    async fn delete_user(&self, Path(id): Path<u64>) -> StatusCode {
        if self.service.delete(id) {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }
}

pub fn routes(registry: &mut RouteRegistry) -> anyhow::Result<()> {
    registry.controller(UserController {
        service: UserService::new(),
    })?;
    Ok(())
}

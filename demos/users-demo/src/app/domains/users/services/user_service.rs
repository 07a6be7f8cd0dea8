use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
}

/// 内存中的用户存储
#[derive(Debug, Default)]
pub struct UserService {
    next_id: AtomicU64,
    users: RwLock<BTreeMap<u64, User>>,
}

impl UserService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    pub fn create(&self, new_user: NewUser) -> User {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let user = User {
            id,
            name: new_user.name,
        };
        self.users.write().insert(id, user.clone());
        user
    }

    pub fn delete(&self, id: u64) -> bool {
        self.users.write().remove(&id).is_some()
    }
}

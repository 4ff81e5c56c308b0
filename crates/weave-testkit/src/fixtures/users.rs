//! User repository contract with cached lookups

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use weave_core::CacheAspect;
use weave_macros::contract;

/// A stored user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Users by id; lookups are cached per receiver type and arguments
#[contract]
pub trait UserRepository: Send + Sync {
    fn save(&self, user: User);

    #[aspect(CacheAspect::in_memory())]
    fn get_by_id(&self, id: Uuid) -> Option<User>;

    #[aspect(CacheAspect::in_memory())]
    fn list(&self, ids: &[Uuid]) -> Vec<User>;

    #[aspect(CacheAspect::in_memory())]
    fn list_many(&self, ids: Vec<Uuid>) -> Vec<User>;

    fn count(&self) -> usize;
}

/// Map-backed repository counting how often each method really runs
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
    save_calls: AtomicUsize,
    get_by_id_calls: AtomicUsize,
    list_calls: AtomicUsize,
    list_many_calls: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let repo = Self::new();
        repo.users
            .write()
            .extend(users.into_iter().map(|user| (user.id, user)));
        repo
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn list_many_calls(&self) -> usize {
        self.list_many_calls.load(Ordering::SeqCst)
    }

    fn collect(&self, ids: &[Uuid]) -> Vec<User> {
        let users = self.users.read();
        ids.iter().filter_map(|id| users.get(id).cloned()).collect()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn save(&self, user: User) {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.users.write().insert(user.id, user);
    }

    fn get_by_id(&self, id: Uuid) -> Option<User> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.users.read().get(&id).cloned()
    }

    fn list(&self, ids: &[Uuid]) -> Vec<User> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.collect(ids)
    }

    fn list_many(&self, ids: Vec<Uuid>) -> Vec<User> {
        self.list_many_calls.fetch_add(1, Ordering::SeqCst);
        self.collect(&ids)
    }

    fn count(&self) -> usize {
        self.users.read().len()
    }
}

/// `count` users named `user-0`, `user-1`, ...
pub fn sample_users(count: usize) -> Vec<User> {
    (0..count).map(|i| User::new(format!("user-{i}"))).collect()
}

/// Repository pre-filled with `users`
pub fn seeded_repository(users: &[User]) -> Arc<InMemoryUserRepository> {
    Arc::new(InMemoryUserRepository::with_users(users.iter().cloned()))
}

//! In-memory stand-in for a MongoDB server.
//!
//! Mirrors the server behavior the bootstrap depends on: duplicate users and
//! collections are rejected, `usersInfo` reports role grants, credentials can
//! be checked, and the whole server can be made unreachable. Every request is
//! recorded so tests can assert what was (and was not) sent.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mongoseed_kernel::{RoleGrant, Secret, UserSpec};

use crate::admin::{AdminApi, DatabaseAdmin};
use crate::error::DbError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    CreateUser { database: String, user: String },
    UsersInfo { database: String, user: String },
    ListCollections { database: String },
    CreateCollection { database: String, collection: String },
    Authenticate { database: String, user: String },
}

impl Request {
    /// True for requests that change server state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Request::CreateUser { .. } | Request::CreateCollection { .. }
        )
    }
}

#[derive(Debug)]
struct StoredUser {
    password: Secret,
    roles: Vec<RoleGrant>,
}

#[derive(Debug, Default)]
struct DatabaseState {
    users: BTreeMap<String, StoredUser>,
    collections: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct ServerState {
    unreachable: bool,
    admin_login_rejected: bool,
    databases: BTreeMap<String, DatabaseState>,
    requests: Vec<Request>,
}

impl ServerState {
    /// Record the request, then fail if the server is down.
    fn accept(&mut self, request: Request) -> Result<(), DbError> {
        self.requests.push(request);
        if self.unreachable {
            return Err(DbError::Unreachable(
                "connection refused (in-memory server is down)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shared handle; clones observe the same server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdmin {
    state: Arc<Mutex<ServerState>>,
}

impl InMemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server that refuses every request.
    pub fn unreachable() -> Self {
        let admin = Self::new();
        admin.set_reachable(false);
        admin
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().unreachable = !reachable;
    }

    /// Make the administrative connection fail authentication, as with wrong
    /// credentials in the connection URI.
    pub fn reject_admin_login(&self, rejected: bool) {
        self.lock().admin_login_rejected = rejected;
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn collections(&self, database: &str) -> BTreeSet<String> {
        self.lock()
            .databases
            .get(database)
            .map(|db| db.collections.clone())
            .unwrap_or_default()
    }

    pub fn user_roles(&self, database: &str, user: &str) -> Option<Vec<RoleGrant>> {
        self.lock()
            .databases
            .get(database)
            .and_then(|db| db.users.get(user))
            .map(|stored| stored.roles.clone())
    }

    /// Create a collection directly, bypassing request recording.
    pub fn seed_collection(&self, database: &str, collection: &str) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .collections
            .insert(collection.to_string());
    }

    /// Create a user directly, bypassing request recording.
    pub fn seed_user(&self, database: &str, user: &UserSpec) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .users
            .insert(
                user.name.clone(),
                StoredUser {
                    password: user.password.clone(),
                    roles: user.roles.clone(),
                },
            );
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().expect("in-memory server state poisoned")
    }
}

#[async_trait]
impl AdminApi for InMemoryAdmin {
    type Database = InMemoryDatabase;

    async fn ping(&self) -> Result<(), DbError> {
        let mut state = self.lock();
        state.accept(Request::Ping)?;
        if state.admin_login_rejected {
            return Err(DbError::AuthenticationFailed(
                "SCRAM authentication failed for the administrative user".to_string(),
            ));
        }
        Ok(())
    }

    fn select_database(&self, name: &str) -> InMemoryDatabase {
        InMemoryDatabase {
            name: name.to_string(),
            admin: self.clone(),
        }
    }

    async fn authenticate(
        &self,
        database: &str,
        username: &str,
        password: &Secret,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        state.accept(Request::Authenticate {
            database: database.to_string(),
            user: username.to_string(),
        })?;

        let valid = state
            .databases
            .get(database)
            .and_then(|db| db.users.get(username))
            .is_some_and(|stored| stored.password == *password);

        if valid {
            Ok(())
        } else {
            Err(DbError::AuthenticationFailed(format!(
                "SCRAM authentication failed for '{username}' on '{database}'"
            )))
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    name: String,
    admin: InMemoryAdmin,
}

#[async_trait]
impl DatabaseAdmin for InMemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_user(&self, user: &UserSpec) -> Result<(), DbError> {
        let mut state = self.admin.lock();
        state.accept(Request::CreateUser {
            database: self.name.clone(),
            user: user.name.clone(),
        })?;

        let db = state.databases.entry(self.name.clone()).or_default();
        if db.users.contains_key(&user.name) {
            return Err(DbError::UserExists {
                user: user.name.clone(),
                database: self.name.clone(),
            });
        }

        db.users.insert(
            user.name.clone(),
            StoredUser {
                password: user.password.clone(),
                roles: user.roles.clone(),
            },
        );
        Ok(())
    }

    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, DbError> {
        let mut state = self.admin.lock();
        state.accept(Request::UsersInfo {
            database: self.name.clone(),
            user: username.to_string(),
        })?;

        Ok(state
            .databases
            .get(&self.name)
            .and_then(|db| db.users.get(username))
            .map(|stored| stored.roles.clone()))
    }

    async fn list_collections(&self) -> Result<Vec<String>, DbError> {
        let mut state = self.admin.lock();
        state.accept(Request::ListCollections {
            database: self.name.clone(),
        })?;

        Ok(state
            .databases
            .get(&self.name)
            .map(|db| db.collections.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_collection(&self, name: &str) -> Result<(), DbError> {
        let mut state = self.admin.lock();
        state.accept(Request::CreateCollection {
            database: self.name.clone(),
            collection: name.to_string(),
        })?;

        let db = state.databases.entry(self.name.clone()).or_default();
        if !db.collections.insert(name.to_string()) {
            return Err(DbError::CollectionExists {
                collection: name.to_string(),
                database: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_user() -> UserSpec {
        UserSpec {
            name: "demo_user".into(),
            password: Secret::new("demo_password"),
            roles: vec![RoleGrant::new("readWrite", "demo")],
        }
    }

    #[tokio::test]
    async fn duplicate_user_is_rejected() {
        let admin = InMemoryAdmin::new();
        let db = admin.select_database("demo");

        db.create_user(&demo_user()).await.unwrap();
        let err = db.create_user(&demo_user()).await.unwrap_err();

        assert!(matches!(err, DbError::UserExists { .. }));
    }

    #[tokio::test]
    async fn users_are_scoped_per_database() {
        let admin = InMemoryAdmin::new();
        admin.select_database("demo").create_user(&demo_user()).await.unwrap();

        let other = admin.select_database("other");
        assert_eq!(other.user_roles("demo_user").await.unwrap(), None);
        other.create_user(&demo_user()).await.unwrap();
    }

    #[tokio::test]
    async fn authentication_checks_password_and_database() {
        let admin = InMemoryAdmin::new();
        admin.seed_user("demo", &demo_user());

        admin
            .authenticate("demo", "demo_user", &Secret::new("demo_password"))
            .await
            .unwrap();

        let wrong_password = admin
            .authenticate("demo", "demo_user", &Secret::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, DbError::AuthenticationFailed(_)));

        let wrong_db = admin
            .authenticate("admin", "demo_user", &Secret::new("demo_password"))
            .await
            .unwrap_err();
        assert!(matches!(wrong_db, DbError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_server_records_but_refuses() {
        let admin = InMemoryAdmin::unreachable();

        let err = admin.ping().await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(admin.requests(), vec![Request::Ping]);
        assert!(!admin.requests().iter().any(Request::is_write));
    }
}

//! Administrative operations the bootstrap needs, and their MongoDB implementation.

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Database};
use mongoseed_kernel::{RoleGrant, Secret, UserSpec};

use crate::error::{DbError, NAMESPACE_EXISTS_CODE, USER_EXISTS_CODE};

/// Server-level administrative connection.
#[async_trait]
pub trait AdminApi: Send + Sync {
    type Database: DatabaseAdmin;

    /// Round-trip to the server. Creating a client does not connect.
    async fn ping(&self) -> Result<(), DbError>;

    /// Handle scoped to one database; does not contact the server.
    fn select_database(&self, name: &str) -> Self::Database;

    /// Log in as `username` against `database` and run a trivial command.
    async fn authenticate(
        &self,
        database: &str,
        username: &str,
        password: &Secret,
    ) -> Result<(), DbError>;
}

/// Operations against the selected database.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    fn name(&self) -> &str;

    /// Register a user in this database. Fails with `UserExists` on duplicates.
    async fn create_user(&self, user: &UserSpec) -> Result<(), DbError>;

    /// Role grants of `username`, or `None` if no such user exists here.
    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, DbError>;

    async fn list_collections(&self) -> Result<Vec<String>, DbError>;

    /// Create an empty collection with default options. Fails with
    /// `CollectionExists` on duplicates.
    async fn create_collection(&self, name: &str) -> Result<(), DbError>;
}

/// `AdminApi` backed by the MongoDB driver.
#[derive(Clone, Debug)]
pub struct MongoAdmin {
    client: Client,
    options: ClientOptions,
}

impl MongoAdmin {
    pub fn new(client: Client, options: ClientOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl AdminApi for MongoAdmin {
    type Database = MongoDatabase;

    async fn ping(&self) -> Result<(), DbError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    fn select_database(&self, name: &str) -> MongoDatabase {
        MongoDatabase {
            db: self.client.database(name),
        }
    }

    async fn authenticate(
        &self,
        database: &str,
        username: &str,
        password: &Secret,
    ) -> Result<(), DbError> {
        let mut options = self.options.clone();
        options.credential = Some(
            Credential::builder()
                .username(username.to_string())
                .password(password.expose().to_string())
                .source(database.to_string())
                .build(),
        );

        let client = Client::with_options(options)?;
        let result = client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await;
        client.shutdown().await;

        result.map(|_| ()).map_err(DbError::from)
    }
}

#[derive(Clone, Debug)]
pub struct MongoDatabase {
    db: Database,
}

#[async_trait]
impl DatabaseAdmin for MongoDatabase {
    fn name(&self) -> &str {
        self.db.name()
    }

    async fn create_user(&self, user: &UserSpec) -> Result<(), DbError> {
        let roles: Vec<Document> = user
            .roles
            .iter()
            .map(|grant| doc! { "role": grant.role.as_str(), "db": grant.db.as_str() })
            .collect();

        let command = doc! {
            "createUser": user.name.as_str(),
            "pwd": user.password.expose(),
            "roles": roles,
        };

        match self.db.run_command(command).await.map_err(DbError::from) {
            Ok(_) => Ok(()),
            Err(DbError::Command { code, .. }) if code == USER_EXISTS_CODE => {
                Err(DbError::UserExists {
                    user: user.name.clone(),
                    database: self.name().to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, DbError> {
        let response = self
            .db
            .run_command(doc! { "usersInfo": username })
            .await?;

        parse_users_info(&response, username)
    }

    async fn list_collections(&self) -> Result<Vec<String>, DbError> {
        Ok(self.db.list_collection_names().await?)
    }

    async fn create_collection(&self, name: &str) -> Result<(), DbError> {
        match self.db.create_collection(name).await.map_err(DbError::from) {
            Ok(()) => Ok(()),
            Err(DbError::Command { code, .. }) if code == NAMESPACE_EXISTS_CODE => {
                Err(DbError::CollectionExists {
                    collection: name.to_string(),
                    database: self.name().to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Extract the role grants of `username` from a `usersInfo` reply.
fn parse_users_info(response: &Document, username: &str) -> Result<Option<Vec<RoleGrant>>, DbError> {
    let unexpected = |what: &str| DbError::UnexpectedResponse(format!("usersInfo: {what}"));

    let users = response
        .get_array("users")
        .map_err(|_| unexpected("missing users array"))?;

    for entry in users {
        let Bson::Document(user) = entry else {
            return Err(unexpected("user entry is not a document"));
        };
        if user.get_str("user").ok() != Some(username) {
            continue;
        }

        let roles = user
            .get_array("roles")
            .map_err(|_| unexpected("missing roles array"))?
            .iter()
            .map(|role| match role {
                Bson::Document(grant) => match (grant.get_str("role"), grant.get_str("db")) {
                    (Ok(role), Ok(db)) => Ok(RoleGrant::new(role, db)),
                    _ => Err(unexpected("role grant without role/db")),
                },
                _ => Err(unexpected("role grant is not a document")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        return Ok(Some(roles));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_info_with_matching_user() {
        let response = doc! {
            "users": [{
                "_id": "demo.demo_user",
                "user": "demo_user",
                "db": "demo",
                "roles": [{ "role": "readWrite", "db": "demo" }],
            }],
            "ok": 1.0,
        };

        let roles = parse_users_info(&response, "demo_user").unwrap();
        assert_eq!(roles, Some(vec![RoleGrant::new("readWrite", "demo")]));
    }

    #[test]
    fn users_info_without_user() {
        let response = doc! { "users": [], "ok": 1.0 };
        assert_eq!(parse_users_info(&response, "demo_user").unwrap(), None);
    }

    #[test]
    fn users_info_missing_users_is_unexpected() {
        let response = doc! { "ok": 1.0 };
        let err = parse_users_info(&response, "demo_user").unwrap_err();
        assert!(matches!(err, DbError::UnexpectedResponse(_)));
    }

    #[test]
    fn users_info_with_malformed_role() {
        let response = doc! {
            "users": [{ "user": "demo_user", "roles": [{ "role": "readWrite" }] }],
            "ok": 1.0,
        };
        let err = parse_users_info(&response, "demo_user").unwrap_err();
        assert!(matches!(err, DbError::UnexpectedResponse(_)));
    }
}

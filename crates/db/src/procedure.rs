//! The bootstrap procedure: select database, create user, create collections.

use std::collections::HashSet;
use std::fmt;

use mongoseed_kernel::{BootstrapPlan, ExistingPolicy, RoleGrant, UserSpec};
use tracing::{info, instrument, warn};

use crate::admin::{AdminApi, DatabaseAdmin};
use crate::error::BootstrapError;

/// Line printed to stdout once every step succeeded.
pub const COMPLETION_MESSAGE: &str = "Database initialization completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyPresent,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::AlreadyPresent => "already_present",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one run of the procedure did, step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub database: String,
    pub user: Outcome,
    pub collections: Vec<(String, Outcome)>,
}

impl BootstrapReport {
    pub fn created_anything(&self) -> bool {
        self.user == Outcome::Created
            || self
                .collections
                .iter()
                .any(|(_, outcome)| *outcome == Outcome::Created)
    }
}

/// Run the plan against the server.
///
/// The first failing step aborts the run; earlier steps are not undone.
/// Under [`ExistingPolicy::Fail`] a duplicate user or collection is such a
/// failure. Under [`ExistingPolicy::Skip`] existing objects are reported as
/// [`Outcome::AlreadyPresent`].
#[instrument(skip_all, fields(database = %plan.database, policy = ?plan.policy))]
pub async fn run_bootstrap<A: AdminApi>(
    admin: &A,
    plan: &BootstrapPlan,
) -> Result<BootstrapReport, BootstrapError> {
    admin.ping().await.map_err(BootstrapError::from_ping)?;

    let db = admin.select_database(&plan.database);
    info!(database = db.name(), "selected target database");

    let user = ensure_user(&db, &plan.user, plan.policy).await?;

    let existing: HashSet<String> = match plan.policy {
        ExistingPolicy::Fail => HashSet::new(),
        ExistingPolicy::Skip => db
            .list_collections()
            .await
            .map_err(|source| BootstrapError::ListCollections {
                database: plan.database.clone(),
                source,
            })?
            .into_iter()
            .collect(),
    };

    let mut collections = Vec::with_capacity(plan.collections.len());
    for spec in &plan.collections {
        if existing.contains(&spec.name) {
            info!(collection = %spec.name, outcome = %Outcome::AlreadyPresent, "collection exists, skipping");
            collections.push((spec.name.clone(), Outcome::AlreadyPresent));
            continue;
        }

        db.create_collection(&spec.name)
            .await
            .map_err(|source| BootstrapError::CreateCollection {
                collection: spec.name.clone(),
                database: plan.database.clone(),
                source,
            })?;

        info!(collection = %spec.name, owner = %spec.owner, outcome = %Outcome::Created, "collection created");
        collections.push((spec.name.clone(), Outcome::Created));
    }

    Ok(BootstrapReport {
        database: plan.database.clone(),
        user,
        collections,
    })
}

async fn ensure_user<D: DatabaseAdmin>(
    db: &D,
    user: &UserSpec,
    policy: ExistingPolicy,
) -> Result<Outcome, BootstrapError> {
    if policy == ExistingPolicy::Skip {
        let roles = db
            .user_roles(&user.name)
            .await
            .map_err(|source| BootstrapError::InspectUser {
                user: user.name.clone(),
                database: db.name().to_string(),
                source,
            })?;

        if let Some(roles) = roles {
            if !same_grants(&roles, &user.roles) {
                warn!(user = %user.name, ?roles, "existing user has different role grants; leaving them unchanged");
            }
            info!(user = %user.name, outcome = %Outcome::AlreadyPresent, "user exists, skipping");
            return Ok(Outcome::AlreadyPresent);
        }
    }

    db.create_user(user)
        .await
        .map_err(|source| BootstrapError::CreateUser {
            user: user.name.clone(),
            database: db.name().to_string(),
            source,
        })?;

    info!(user = %user.name, roles = ?user.roles, outcome = %Outcome::Created, "user created");
    Ok(Outcome::Created)
}

/// Order-insensitive comparison of role grants.
pub(crate) fn same_grants(left: &[RoleGrant], right: &[RoleGrant]) -> bool {
    let mut left = left.to_vec();
    let mut right = right.to_vec();
    left.sort();
    right.sort();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::memory::{InMemoryAdmin, Request};
    use mongoseed_kernel::{CollectionSpec, Secret};

    fn demo_plan(policy: ExistingPolicy) -> BootstrapPlan {
        BootstrapPlan {
            database: "demo".to_string(),
            user: UserSpec {
                name: "demo_user".to_string(),
                password: Secret::new("demo_password"),
                roles: vec![RoleGrant::new("readWrite", "demo")],
            },
            collections: vec![
                CollectionSpec::new("posts", "posts"),
                CollectionSpec::new("files", "files"),
            ],
            policy,
        }
    }

    #[tokio::test]
    async fn fresh_server_gets_user_and_collections() {
        let admin = InMemoryAdmin::new();

        let report = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap();

        assert_eq!(report.user, Outcome::Created);
        assert_eq!(
            report.collections,
            vec![
                ("posts".to_string(), Outcome::Created),
                ("files".to_string(), Outcome::Created),
            ]
        );
        assert_eq!(
            admin.user_roles("demo", "demo_user"),
            Some(vec![RoleGrant::new("readWrite", "demo")])
        );
        assert_eq!(
            admin.collections("demo").into_iter().collect::<Vec<_>>(),
            ["files", "posts"]
        );
    }

    #[tokio::test]
    async fn requests_follow_script_order() {
        let admin = InMemoryAdmin::new();
        run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap();

        assert_eq!(
            admin.requests(),
            vec![
                Request::Ping,
                Request::CreateUser {
                    database: "demo".into(),
                    user: "demo_user".into()
                },
                Request::CreateCollection {
                    database: "demo".into(),
                    collection: "posts".into()
                },
                Request::CreateCollection {
                    database: "demo".into(),
                    collection: "files".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn second_run_fails_on_existing_user() {
        let admin = InMemoryAdmin::new();
        let plan = demo_plan(ExistingPolicy::Fail);
        run_bootstrap(&admin, &plan).await.unwrap();

        let err = run_bootstrap(&admin, &plan).await.unwrap_err();

        assert!(err.is_already_exists());
        assert!(matches!(
            err,
            BootstrapError::CreateUser {
                source: DbError::UserExists { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn existing_collection_aborts_remaining_steps() {
        let admin = InMemoryAdmin::new();
        admin.seed_collection("demo", "posts");

        let err = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::CreateCollection { ref collection, .. } if collection == "posts"
        ));
        assert!(!admin.collections("demo").contains("files"));
    }

    #[tokio::test]
    async fn unreachable_server_creates_nothing() {
        let admin = InMemoryAdmin::unreachable();

        let err = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::Connect(DbError::Unreachable(_))));
        assert_eq!(admin.requests(), vec![Request::Ping]);
    }

    #[tokio::test]
    async fn rejected_admin_login_creates_nothing() {
        let admin = InMemoryAdmin::new();
        admin.reject_admin_login(true);

        let err = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::AdminLogin(DbError::AuthenticationFailed(_))
        ));
        assert!(!err.to_string().contains("could not reach"));
        assert_eq!(admin.requests(), vec![Request::Ping]);
    }

    #[tokio::test]
    async fn idempotent_rerun_reports_already_present() {
        let admin = InMemoryAdmin::new();
        run_bootstrap(&admin, &demo_plan(ExistingPolicy::Fail))
            .await
            .unwrap();

        let report = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Skip))
            .await
            .unwrap();

        assert_eq!(report.user, Outcome::AlreadyPresent);
        assert!(report
            .collections
            .iter()
            .all(|(_, outcome)| *outcome == Outcome::AlreadyPresent));
        assert!(!report.created_anything());
    }

    #[tokio::test]
    async fn idempotent_run_fills_in_missing_collections() {
        let admin = InMemoryAdmin::new();
        admin.seed_collection("demo", "posts");

        let report = run_bootstrap(&admin, &demo_plan(ExistingPolicy::Skip))
            .await
            .unwrap();

        assert_eq!(report.user, Outcome::Created);
        assert_eq!(
            report.collections,
            vec![
                ("posts".to_string(), Outcome::AlreadyPresent),
                ("files".to_string(), Outcome::Created),
            ]
        );
    }

    #[test]
    fn grant_comparison_ignores_order() {
        let a = vec![RoleGrant::new("read", "x"), RoleGrant::new("readWrite", "demo")];
        let b = vec![RoleGrant::new("readWrite", "demo"), RoleGrant::new("read", "x")];
        assert!(same_grants(&a, &b));
        assert!(!same_grants(&a, &b[..1]));
    }
}

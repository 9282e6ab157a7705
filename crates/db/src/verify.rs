//! Post-run checks: did the bootstrap leave the server in the planned state?

use std::collections::HashSet;
use std::fmt;

use mongoseed_kernel::{BootstrapPlan, RoleGrant};
use tracing::{info, instrument, warn};

use crate::admin::{AdminApi, DatabaseAdmin};
use crate::error::DbError;
use crate::procedure::same_grants;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    UserMissing {
        user: String,
        database: String,
    },
    RolesMismatch {
        user: String,
        expected: Vec<RoleGrant>,
        actual: Vec<RoleGrant>,
    },
    CollectionMissing {
        collection: String,
        database: String,
    },
    AuthenticationFailed {
        user: String,
        database: String,
        reason: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UserMissing { user, database } => {
                write!(f, "user '{user}' does not exist in database '{database}'")
            }
            Finding::RolesMismatch {
                user,
                expected,
                actual,
            } => write!(
                f,
                "user '{user}' has roles {} but {} were planned",
                format_grants(actual),
                format_grants(expected)
            ),
            Finding::CollectionMissing {
                collection,
                database,
            } => write!(
                f,
                "collection '{collection}' does not exist in database '{database}'"
            ),
            Finding::AuthenticationFailed {
                user,
                database,
                reason,
            } => write!(
                f,
                "user '{user}' cannot authenticate against '{database}': {reason}"
            ),
        }
    }
}

fn format_grants(grants: &[RoleGrant]) -> String {
    let parts: Vec<String> = grants
        .iter()
        .map(|grant| format!("{}@{}", grant.role, grant.db))
        .collect();
    format!("[{}]", parts.join(", "))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub findings: Vec<Finding>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Compare the server state with the plan.
///
/// Missing objects and failed logins become findings; any other request
/// failure (server down, permission denied) is returned as an error.
#[instrument(skip_all, fields(database = %plan.database))]
pub async fn verify<A: AdminApi>(admin: &A, plan: &BootstrapPlan) -> Result<VerifyReport, DbError> {
    admin.ping().await?;

    let db = admin.select_database(&plan.database);
    let mut findings = Vec::new();

    match db.user_roles(&plan.user.name).await? {
        None => findings.push(Finding::UserMissing {
            user: plan.user.name.clone(),
            database: plan.database.clone(),
        }),
        Some(actual) => {
            if !same_grants(&actual, &plan.user.roles) {
                findings.push(Finding::RolesMismatch {
                    user: plan.user.name.clone(),
                    expected: plan.user.roles.clone(),
                    actual,
                });
            }

            match admin
                .authenticate(&plan.database, &plan.user.name, &plan.user.password)
                .await
            {
                Ok(()) => {}
                Err(DbError::AuthenticationFailed(reason)) => {
                    findings.push(Finding::AuthenticationFailed {
                        user: plan.user.name.clone(),
                        database: plan.database.clone(),
                        reason,
                    })
                }
                Err(err) => return Err(err),
            }
        }
    }

    let present: HashSet<String> = db.list_collections().await?.into_iter().collect();
    for name in plan.collection_names() {
        if !present.contains(name) {
            findings.push(Finding::CollectionMissing {
                collection: name.to_string(),
                database: plan.database.clone(),
            });
        }
    }

    for finding in &findings {
        warn!(%finding, "verification finding");
    }
    info!(findings = findings.len(), "verification finished");

    Ok(VerifyReport { findings })
}

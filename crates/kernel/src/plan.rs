//! The resolved bootstrap plan: which database, which user, which collections.

use serde::Serialize;
use thiserror::Error;

use crate::registry::ModuleRegistry;
use crate::secret::{Secret, SecretError};
use crate::settings::BootstrapSettings;

/// MongoDB rejects database names longer than this.
const MAX_DATABASE_NAME_BYTES: usize = 63;
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

/// Binds a user to a permission level within one database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSpec {
    pub name: String,
    pub password: Secret,
    pub roles: Vec<RoleGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    pub name: String,
    /// Module that contributed the collection.
    pub owner: String,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// How the procedure treats a user or collection that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    /// Let the server reject the duplicate and abort.
    #[default]
    Fail,
    /// Check first and leave existing objects untouched.
    Skip,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapPlan {
    pub database: String,
    pub user: UserSpec,
    pub collections: Vec<CollectionSpec>,
    pub policy: ExistingPolicy,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid database name '{name}': {reason}")]
    InvalidDatabase { name: String, reason: &'static str },

    #[error("username must not be empty")]
    EmptyUsername,

    #[error("no password configured; set MONGOSEED_BOOTSTRAP__PASSWORD or bootstrap.password_file")]
    MissingPassword,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("both bootstrap.password and bootstrap.password_file are set")]
    ConflictingPasswordSources,

    #[error("user '{0}' has no role grants")]
    NoRoles(String),

    #[error("invalid collection name '{name}': {reason}")]
    InvalidCollection { name: String, reason: &'static str },

    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl BootstrapPlan {
    /// Resolve settings and module contributions into a validated plan.
    ///
    /// Collections keep registration order; duplicates are dropped and the
    /// first contributor is kept as owner. Extra collections from settings
    /// are appended under the `settings` owner.
    pub fn resolve(
        settings: &BootstrapSettings,
        registry: &ModuleRegistry,
    ) -> Result<Self, PlanError> {
        let password = resolve_password(settings)?;

        let mut collections: Vec<CollectionSpec> = Vec::new();
        let contributed = registry.collect_collections().into_iter().chain(
            settings
                .extra_collections
                .iter()
                .map(|name| CollectionSpec::new(name.trim(), "settings")),
        );
        for spec in contributed {
            if !collections.iter().any(|existing| existing.name == spec.name) {
                collections.push(spec);
            }
        }

        let plan = Self {
            database: settings.database.clone(),
            user: UserSpec {
                name: settings.username.clone(),
                password,
                roles: vec![RoleGrant::new(&settings.role, &settings.database)],
            },
            collections,
            policy: if settings.idempotent {
                ExistingPolicy::Skip
            } else {
                ExistingPolicy::Fail
            },
        };

        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        validate_database_name(&self.database)?;

        if self.user.name.trim().is_empty() {
            return Err(PlanError::EmptyUsername);
        }
        if self.user.password.is_empty() {
            return Err(PlanError::EmptyPassword);
        }
        if self.user.roles.is_empty() {
            return Err(PlanError::NoRoles(self.user.name.clone()));
        }
        for grant in &self.user.roles {
            validate_database_name(&grant.db)?;
        }

        for collection in &self.collections {
            validate_collection_name(&collection.name)?;
        }

        Ok(())
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.name.as_str())
    }
}

fn resolve_password(settings: &BootstrapSettings) -> Result<Secret, PlanError> {
    match (&settings.password, &settings.password_file) {
        (Some(_), Some(_)) => Err(PlanError::ConflictingPasswordSources),
        (Some(password), None) => Ok(password.clone()),
        (None, Some(path)) => Ok(Secret::from_file(path)?),
        (None, None) => Err(PlanError::MissingPassword),
    }
}

fn validate_database_name(name: &str) -> Result<(), PlanError> {
    let invalid = |reason| PlanError::InvalidDatabase {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_DATABASE_NAME_BYTES {
        return Err(invalid("longer than 63 bytes"));
    }
    if name.contains(FORBIDDEN_DATABASE_CHARS) || name.contains('\0') {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> Result<(), PlanError> {
    let invalid = |reason| PlanError::InvalidCollection {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(invalid("contains a forbidden character"));
    }
    if name.starts_with("system.") {
        return Err(invalid("the system. prefix is reserved"));
    }
    Ok(())
}

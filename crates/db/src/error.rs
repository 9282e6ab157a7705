//! Error types for the MongoDB admin layer and the bootstrap procedure.

use mongodb::error::ErrorKind;
use thiserror::Error;

/// Server code for `createUser` on a name that is already taken.
pub const USER_EXISTS_CODE: i32 = 51003;
/// Server code `NamespaceExists`.
pub const NAMESPACE_EXISTS_CODE: i32 = 48;
/// Server code `AuthenticationFailed`.
pub const AUTHENTICATION_FAILED_CODE: i32 = 18;

/// Failures of a single administrative request.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid MongoDB connection URI")]
    InvalidUri(#[source] mongodb::error::Error),

    #[error("database server unreachable: {0}")]
    Unreachable(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("user '{user}' already exists in database '{database}'")]
    UserExists { user: String, database: String },

    #[error("collection '{collection}' already exists in database '{database}'")]
    CollectionExists {
        collection: String,
        database: String,
    },

    #[error("command failed with code {code} ({code_name}): {message}")]
    Command {
        code: i32,
        code_name: String,
        message: String,
    },

    #[error("unexpected server response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Driver(mongodb::error::Error),
}

impl DbError {
    /// Server command error code, when the server answered with one.
    pub fn code(&self) -> Option<i32> {
        match self {
            DbError::Command { code, .. } => Some(*code),
            DbError::UserExists { .. } => Some(USER_EXISTS_CODE),
            DbError::CollectionExists { .. } => Some(NAMESPACE_EXISTS_CODE),
            _ => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, DbError::Unreachable(_))
    }
}

impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        let classified = match err.kind.as_ref() {
            ErrorKind::Command(cmd) if cmd.code == AUTHENTICATION_FAILED_CODE => {
                Some(DbError::AuthenticationFailed(cmd.message.clone()))
            }
            ErrorKind::Command(cmd) => Some(DbError::Command {
                code: cmd.code,
                code_name: cmd.code_name.clone(),
                message: cmd.message.clone(),
            }),
            ErrorKind::Authentication { message, .. } => {
                Some(DbError::AuthenticationFailed(message.clone()))
            }
            ErrorKind::ServerSelection { message, .. } => {
                Some(DbError::Unreachable(message.clone()))
            }
            ErrorKind::Io(io) => Some(DbError::Unreachable(io.to_string())),
            _ => None,
        };

        classified.unwrap_or(DbError::Driver(err))
    }
}

/// Failures of the bootstrap procedure, tagged with the step that failed.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("could not reach the database server; nothing was created")]
    Connect(#[source] DbError),

    #[error("the database server rejected the administrative login; nothing was created")]
    AdminLogin(#[source] DbError),

    #[error("failed to look up user '{user}' in database '{database}'")]
    InspectUser {
        user: String,
        database: String,
        #[source]
        source: DbError,
    },

    #[error("failed to create user '{user}' in database '{database}'")]
    CreateUser {
        user: String,
        database: String,
        #[source]
        source: DbError,
    },

    #[error("failed to list collections of database '{database}'")]
    ListCollections {
        database: String,
        #[source]
        source: DbError,
    },

    #[error("failed to create collection '{collection}' in database '{database}'")]
    CreateCollection {
        collection: String,
        database: String,
        #[source]
        source: DbError,
    },
}

impl BootstrapError {
    /// Classify a failed initial ping.
    pub fn from_ping(source: DbError) -> Self {
        match source {
            DbError::AuthenticationFailed(_) => BootstrapError::AdminLogin(source),
            other => BootstrapError::Connect(other),
        }
    }

    /// Underlying admin request failure.
    pub fn db_error(&self) -> &DbError {
        match self {
            BootstrapError::Connect(source)
            | BootstrapError::AdminLogin(source)
            | BootstrapError::InspectUser { source, .. }
            | BootstrapError::CreateUser { source, .. }
            | BootstrapError::ListCollections { source, .. }
            | BootstrapError::CreateCollection { source, .. } => source,
        }
    }

    /// True when the server rejected a duplicate user or collection.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self.db_error(),
            DbError::UserExists { .. } | DbError::CollectionExists { .. }
        )
    }
}

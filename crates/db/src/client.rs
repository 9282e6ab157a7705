use std::time::Duration;

use mongodb::options::ClientOptions;
use mongodb::Client;
use mongoseed_kernel::settings::MongoSettings;
use tracing::{debug, instrument};

use crate::admin::MongoAdmin;
use crate::error::DbError;

/// Build an administrative client from settings.
///
/// No network round-trip happens here; the bootstrap procedure pings the
/// server before issuing any request.
#[instrument(skip_all, fields(app_name = %settings.app_name))]
pub async fn connect(settings: &MongoSettings) -> Result<MongoAdmin, DbError> {
    let mut options = ClientOptions::parse(&settings.uri)
        .await
        .map_err(DbError::InvalidUri)?;

    options.app_name = Some(settings.app_name.clone());
    options.connect_timeout = Some(Duration::from_millis(settings.connect_timeout_ms));
    options.server_selection_timeout =
        Some(Duration::from_millis(settings.server_selection_timeout_ms));

    let hosts: Vec<String> = options.hosts.iter().map(ToString::to_string).collect();
    debug!(?hosts, "creating MongoDB client");

    let client = Client::with_options(options.clone())?;
    Ok(MongoAdmin::new(client, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_malformed_uri() {
        let settings = MongoSettings {
            uri: "postgres://127.0.0.1:5432".to_string(),
            ..MongoSettings::default()
        };

        let err = connect(&settings).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn builds_client_without_contacting_server() {
        let settings = MongoSettings {
            uri: "mongodb://127.0.0.1:1".to_string(),
            ..MongoSettings::default()
        };

        assert!(connect(&settings).await.is_ok());
    }
}

//! Connection manager: one client per process, opened at startup and
//! released explicitly at shutdown.

use crate::domain::model::{BookModel, DocumentModel};
use crate::error::{Result, StoreError};
use crate::infra::config;
use crate::storage::MongoStore;
use bson::doc;
use mongodb::{Client, Database};

pub struct Connection {
    client: Client,
    database: Database,
}

impl Connection {
    /// Opens a client for `uri` and verifies it with a `ping`.
    ///
    /// `database` overrides the database named in the URI path.
    #[tracing::instrument(skip(uri))]
    pub async fn open(uri: &str, database: Option<&str>) -> Result<Self> {
        tracing::debug!("connecting to MongoDB");
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to create MongoDB client: {}", e)))?;

        let database = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(config::DEFAULT_DATABASE)),
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to MongoDB: {}", e)))?;

        tracing::info!(database = database.name(), "connected to MongoDB");
        Ok(Self { client, database })
    }

    /// Opens the connection described by the environment (`.env` included).
    pub async fn from_env() -> Result<Self> {
        config::load_dotenv();
        let uri = config::mongodb_uri()?;
        let database = config::mongodb_database();
        Self::open(&uri, database.as_deref()).await
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// Store bound to the books collection.
    pub fn books(&self) -> MongoStore {
        MongoStore::new(self.database.clone(), BookModel.collection_name())
    }

    /// Closes the client, waiting for in-flight operations to finish.
    pub async fn close(self) {
        tracing::debug!(database = self.database.name(), "closing MongoDB client");
        self.client.shutdown().await;
    }
}

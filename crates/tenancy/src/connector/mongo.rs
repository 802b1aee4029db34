//! MongoDB connector.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, warn};

use super::Connector;
use crate::registry::RegistryConfig;
use crate::schema::{IndexDefinition, SchemaDefinition};
use crate::tenant::ConnectionTarget;

/// Database used when the URI names none and the driver has no default.
const FALLBACK_DATABASE: &str = "test";

/// A live MongoDB client bound to the tenant's database.
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the tenant database.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

/// Connector for MongoDB tenant databases.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    app_name: String,
    connect_timeout: Duration,
}

impl MongoConnector {
    /// Creates a connector that reports `app_name` and bounds server
    /// selection by `connect_timeout`.
    pub fn new(app_name: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            app_name: app_name.into(),
            connect_timeout,
        }
    }

    /// Creates a connector from registry configuration.
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.app_name.clone(), config.connect_timeout)
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Connection = MongoConnection;
    type Binding = Collection<Document>;
    type Error = mongodb::error::Error;

    fn kind(&self) -> &'static str {
        "mongodb"
    }

    fn scheme(&self) -> &str {
        "mongodb"
    }

    async fn connect(&self, target: &ConnectionTarget) -> Result<MongoConnection, Self::Error> {
        let mut options = ClientOptions::parse(target.uri()).await?;
        options.app_name = Some(self.app_name.clone());
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        let client = Client::with_options(options)?;
        let database = match target.database() {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
        };

        database.run_command(doc! { "ping": 1 }).await?;
        debug!(uri = %target, database = database.name(), "MongoDB ping succeeded");

        Ok(MongoConnection { client, database })
    }

    fn bind(
        &self,
        connection: &MongoConnection,
        entity: &str,
        schema: &SchemaDefinition,
    ) -> Collection<Document> {
        let collection = connection
            .database
            .collection::<Document>(&collection_name(entity));

        let indexes: Vec<IndexModel> = schema.index_plan().iter().map(index_model).collect();
        if !indexes.is_empty() {
            let target = collection.clone();
            let entity = entity.to_string();
            tokio::spawn(async move {
                match target.create_indexes(indexes).await {
                    Ok(result) => {
                        debug!(entity = %entity, count = result.index_names.len(), "indexes ensured")
                    }
                    Err(error) => warn!(entity = %entity, %error, "index creation failed"),
                }
            });
        }

        collection
    }

    async fn close(&self, connection: MongoConnection) {
        connection.client.shutdown().await;
    }
}

/// Lower-cased, pluralized collection name for an entity.
fn collection_name(entity: &str) -> String {
    let mut name = entity.to_lowercase();
    if !name.ends_with('s') {
        name.push('s');
    }
    name
}

fn index_model(index: &IndexDefinition) -> IndexModel {
    let mut keys = Document::new();
    for (field, ascending) in &index.keys {
        keys.insert(field.clone(), if *ascending { 1 } else { -1 });
    }

    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(index.unique)
                .sparse(index.sparse)
                .build(),
        )
        .build()
}

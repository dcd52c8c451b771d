//! MongoDB client and collection wrapper
//!
//! Typed collection access with schema-declared indexes and soft deletes,
//! backing the off-chain side of the fallback store.

use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use mongodb::{options::IndexOptions, Client, Collection, IndexModel};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info};

use crate::fallback::DocumentStore;
use crate::types::{AlmonerError, FallbackRecord, IdValue, Result};

/// Document bookkeeping fields shared by every collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Campaign record as stored in the document collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub record: FallbackRecord,
}

impl IntoIndexes for CampaignDocument {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "id": 1 },
            Some(IndexOptions::builder().unique(true).build()),
        )]
    }
}

impl MutMetadata for CampaignDocument {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| AlmonerError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AlmonerError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| AlmonerError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        use futures_util::StreamExt;

        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| AlmonerError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|document| async {
                match document {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Replace a document wholesale, inserting when absent
    pub async fn replace_one(&self, filter: Document, mut item: T) -> Result<()> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        if metadata.created_at.is_none() {
            metadata.created_at = Some(DateTime::now());
        }
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .upsert(true)
            .await
            .map_err(|e| AlmonerError::Database(format!("Replace failed: {}", e)))?;

        Ok(())
    }
}

/// Filter matching a stored identifier under either of its shapes.
fn id_filter(id: &IdValue) -> Document {
    let mut shapes: Vec<Bson> = Vec::new();
    if let Some(n) = id.numeric() {
        shapes.push(Bson::Int64(n as i64));
        shapes.push(Bson::String(n.to_string()));
    }
    if let IdValue::Text(s) = id {
        shapes.push(Bson::String(s.clone()));
    }
    doc! { "id": { "$in": shapes } }
}

/// Document-store capability backed by the campaign collection
pub struct MongoDocumentStore {
    campaigns: MongoCollection<CampaignDocument>,
}

impl MongoDocumentStore {
    /// Connect and prepare the campaign collection
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = MongoClient::new(uri, db_name).await?;
        let campaigns = client.collection::<CampaignDocument>("campaigns").await?;
        Ok(Self { campaigns })
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn list(&self) -> Result<Vec<FallbackRecord>> {
        let documents = self.campaigns.find_many(doc! {}).await?;
        Ok(documents.into_iter().map(|d| d.record).collect())
    }

    async fn upsert(&self, record: &FallbackRecord) -> Result<()> {
        let document = CampaignDocument {
            metadata: Metadata::default(),
            record: record.clone(),
        };
        self.campaigns
            .replace_one(id_filter(&record.id), document)
            .await
    }
}

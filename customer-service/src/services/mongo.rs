use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::{ClientOptions, FindOptions, IndexOptions},
    Client as MongoClient, Collection, IndexModel,
};
use service_core::error::AppError;
use std::time::Duration;

use super::repository::{CustomerFilter, CustomerRepository};
use crate::models::{Customer, CustomerStatus};

const COLLECTION: &str = "customers";

/// Keys holding timestamps. They are BSON dates in the collection and RFC 3339 strings
/// everywhere else.
const TIMESTAMP_KEYS: [&str; 4] = ["createdAt", "updatedAt", "date", "paidDate"];

fn to_stored(customer: &Customer) -> Result<Document, AppError> {
    let mut document = bson::to_document(customer)?;
    timestamps_to_bson(&mut document);
    Ok(document)
}

fn from_stored(mut document: Document) -> Result<Customer, AppError> {
    timestamps_to_text(&mut document);
    Ok(bson::from_document(document)?)
}

fn timestamps_to_bson(document: &mut Document) {
    for (key, value) in document.iter_mut() {
        let parsed = match value {
            Bson::String(text) if TIMESTAMP_KEYS.contains(&key.as_str()) => {
                DateTime::parse_from_rfc3339(text).ok()
            }
            Bson::Document(nested) => {
                timestamps_to_bson(nested);
                None
            }
            Bson::Array(items) => {
                for item in items.iter_mut() {
                    if let Bson::Document(nested) = item {
                        timestamps_to_bson(nested);
                    }
                }
                None
            }
            _ => None,
        };
        if let Some(parsed) = parsed {
            *value = Bson::DateTime(bson::DateTime::from_chrono(parsed.with_timezone(&Utc)));
        }
    }
}

fn timestamps_to_text(document: &mut Document) {
    for (_, value) in document.iter_mut() {
        text_value(value);
    }
}

fn text_value(value: &mut Bson) {
    match value {
        Bson::DateTime(date) => {
            let date: DateTime<Utc> = date.to_chrono();
            *value = Bson::String(date.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        Bson::Document(nested) => timestamps_to_text(nested),
        Bson::Array(items) => items.iter_mut().for_each(text_value),
        _ => {}
    }
}

#[derive(Clone)]
pub struct MongoCustomerRepository {
    client: MongoClient,
    customers: Collection<Document>,
}

impl MongoCustomerRepository {
    /// Connects, pings and ensures indexes. Server selection is bounded by
    /// `server_selection_timeout`, so an unreachable server fails fast.
    pub async fn connect(
        uri: &str,
        database: &str,
        server_selection_timeout: Duration,
    ) -> Result<Self, AppError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("customer-service".to_string());
        options.server_selection_timeout = Some(server_selection_timeout);

        let client = MongoClient::with_options(options)?;
        let repository = Self {
            customers: client.database(database).collection(COLLECTION),
            client,
        };

        repository.health_check().await?;
        repository.initialize_indexes().await?;
        tracing::info!(database = %database, "Connected to MongoDB");

        Ok(repository)
    }

    async fn initialize_indexes(&self) -> Result<(), AppError> {
        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("status_lookup".to_string())
                    .build(),
            )
            .build();

        let zone_index = IndexModel::builder()
            .keys(doc! { "zoneId": 1 })
            .options(
                IndexOptions::builder()
                    .name("zone_lookup".to_string())
                    .build(),
            )
            .build();

        self.customers
            .create_indexes([status_index, zone_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create indexes on customers collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created indexes on customers.status and customers.zoneId");

        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for MongoCustomerRepository {
    async fn insert(&self, customer: &Customer) -> Result<(), AppError> {
        self.customers.insert_one(to_stored(customer)?, None).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, AppError> {
        self.customers
            .find_one(doc! { "_id": id }, None)
            .await?
            .map(from_stored)
            .transpose()
    }

    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self.customers.find(filter.to_document(), options).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(from_stored).collect()
    }

    async fn save(&self, customer: &Customer) -> Result<(), AppError> {
        let result = self
            .customers
            .replace_one(doc! { "_id": &customer.id }, to_stored(customer)?, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Customer {} not found",
                customer.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.customers.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn count(&self, status: Option<CustomerStatus>) -> Result<u64, AppError> {
        let filter = CustomerFilter {
            status,
            ..CustomerFilter::default()
        };
        Ok(self
            .customers
            .count_documents(filter.to_document(), None)
            .await?)
    }

    async fn stream_active(
        &self,
    ) -> Result<BoxStream<'static, Result<Customer, AppError>>, AppError> {
        let cursor = self
            .customers
            .find(CustomerFilter::active().to_document(), None)
            .await?;
        Ok(cursor
            .map(|document| from_stored(document.map_err(AppError::from)?))
            .boxed())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

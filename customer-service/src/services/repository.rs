use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::{doc, Document};
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::{Customer, CustomerStatus};

/// Optional equality filters for listing customers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub status: Option<CustomerStatus>,
    pub zone_id: Option<String>,
    pub village_id: Option<String>,
}

impl CustomerFilter {
    pub fn active() -> Self {
        Self {
            status: Some(CustomerStatus::Active),
            ..Self::default()
        }
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        self.status.map_or(true, |status| customer.status == status)
            && self
                .zone_id
                .as_ref()
                .map_or(true, |zone| customer.zone_id.as_ref() == Some(zone))
            && self
                .village_id
                .as_ref()
                .map_or(true, |village| customer.village_id.as_ref() == Some(village))
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(zone_id) = &self.zone_id {
            filter.insert("zoneId", zone_id.as_str());
        }
        if let Some(village_id) = &self.village_id {
            filter.insert("villageId", village_id.as_str());
        }
        filter
    }
}

/// Whole-document persistence for customers. Saves replace the stored document, so the
/// last writer wins when two updates race on the same customer.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn insert(&self, customer: &Customer) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, AppError>;

    /// Newest first.
    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError>;

    /// Fails with `NotFound` when no customer has this id.
    async fn save(&self, customer: &Customer) -> Result<(), AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    async fn count(&self, status: Option<CustomerStatus>) -> Result<u64, AppError>;

    /// Active customers one at a time, without loading the collection up front.
    async fn stream_active(
        &self,
    ) -> Result<BoxStream<'static, Result<Customer, AppError>>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

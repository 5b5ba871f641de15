use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{CustomerFilter, CustomerRepository};
use crate::models::{Customer, CustomerStatus};

/// Process-local store used when MongoDB is not configured or unreachable, and in tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn insert(&self, customer: &Customer) -> Result<(), AppError> {
        let mut customers = self.customers.write().await;
        if customers.contains_key(&customer.id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Customer {} already exists",
                customer.id
            )));
        }
        customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Customer>, AppError> {
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let mut matching: Vec<Customer> = self
            .customers
            .read()
            .await
            .values()
            .filter(|customer| filter.matches(customer))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn save(&self, customer: &Customer) -> Result<(), AppError> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(&customer.id) {
            Some(stored) => {
                *stored = customer.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "Customer {} not found",
                customer.id
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.customers.write().await.remove(id).is_some())
    }

    async fn count(&self, status: Option<CustomerStatus>) -> Result<u64, AppError> {
        let customers = self.customers.read().await;
        let count = customers
            .values()
            .filter(|customer| status.map_or(true, |s| customer.status == s))
            .count();
        Ok(count as u64)
    }

    async fn stream_active(
        &self,
    ) -> Result<BoxStream<'static, Result<Customer, AppError>>, AppError> {
        let active: Vec<Customer> = self
            .customers
            .read()
            .await
            .values()
            .filter(|customer| customer.is_active())
            .cloned()
            .collect();
        Ok(stream::iter(active.into_iter().map(Ok)).boxed())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

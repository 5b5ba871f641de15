#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use customer_service::models::Customer;
use customer_service::services::{CustomerRepository, InMemoryCustomerRepository};
use customer_service::{build_router, AppState};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<InMemoryCustomerRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryCustomerRepository::new()))
    }

    pub fn with_repository(repository: Arc<InMemoryCustomerRepository>) -> Self {
        let state = AppState::new(repository.clone());
        Self {
            router: build_router(state),
            repository,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    /// Sends a request and parses the envelope.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn seed_customer(&self, name: &str, fee: Decimal) -> Customer {
        let mut customer = Customer::new(name, "0700000000", "Test Street 1");
        customer.monthly_fee = fee;
        self.repository.insert(&customer).await.unwrap();
        customer
    }

    pub async fn stored(&self, id: &str) -> Customer {
        self.repository.find_by_id(id).await.unwrap().unwrap()
    }
}

/// JSON number as f64; amounts are serialized as floats.
pub fn num(value: &Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {value}"))
}

/// The ledger row for `month` in a serialized customer's `monthlyPayments`.
pub fn monthly_row<'a>(customer: &'a Value, month: &str) -> &'a Value {
    customer["monthlyPayments"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["month"] == month)
        .unwrap_or_else(|| panic!("no monthlyPayments row for {month}"))
}

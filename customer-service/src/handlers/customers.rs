use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use service_core::utils::ValidatedJson;

use crate::dtos::{CreateCustomerRequest, CustomerStats, UpdateCustomerRequest};
use crate::ledger::Period;
use crate::models::{Customer, CustomerStatus};
use crate::services::CustomerFilter;
use crate::startup::AppState;

async fn load(state: &AppState, id: &str) -> Result<Customer, AppError> {
    state
        .repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, AppError> {
    let customers = state.repository.list(&filter).await?;
    Ok(ApiResponse::ok(customers, "Customers retrieved successfully"))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let customer = load(&state, &id).await?;
    Ok(ApiResponse::ok(customer, "Customer retrieved successfully"))
}

pub async fn create_customer(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer = request.into_customer();
    state.repository.insert(&customer).await?;

    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok(ApiResponse::ok(customer, "Customer created successfully").with_status(StatusCode::CREATED))
}

/// Non-ledger fields only; payment state is changed through the payment endpoints.
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut customer = load(&state, &id).await?;
    request.apply(&mut customer);
    customer.touch(Utc::now());
    state.repository.save(&customer).await?;

    Ok(ApiResponse::ok(customer, "Customer updated successfully"))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.repository.delete(&id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
    }

    tracing::info!(customer_id = %id, "Customer deleted");
    Ok(ApiResponse::message("Customer deleted successfully"))
}

pub async fn customer_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let current = Period::from_date(&Utc::now());
    let stats = CustomerStats {
        total_customers: state.repository.count(None).await?,
        active_customers: state.repository.count(Some(CustomerStatus::Active)).await?,
        pending_payments: state.ledger.pending_payments(current).await?,
    };

    Ok(ApiResponse::ok(stats, "Statistics retrieved successfully"))
}

/// Read-only view of one period, computed even before the period is initialized.
pub async fn customer_balance(
    State(state): State<AppState>,
    Path((id, month)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let period: Period = month.parse()?;
    let view = state.ledger.balance(&id, period).await?;

    Ok(ApiResponse::ok(view, "Balance retrieved successfully"))
}

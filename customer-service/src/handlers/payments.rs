use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use service_core::utils::ValidatedJson;

use crate::dtos::{
    InitializeMonthRequest, MarkAllPaidRequest, PartialPaymentRequest, RecordPaymentRequest,
};
use crate::startup::AppState;

pub async fn initialize_month(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<InitializeMonthRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (period, date) = request.into_parts()?;
    let customer = state.ledger.initialize_month(&id, period, date).await?;

    Ok(ApiResponse::ok(customer, "Monthly payment initialized successfully"))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (period, settle, details) = request.into_parts()?;
    let customer = state.ledger.record_payment(&id, period, settle, details).await?;

    Ok(ApiResponse::ok(customer, "Payment updated successfully"))
}

pub async fn record_partial_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<PartialPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (period, amount, details) = request.into_parts()?;
    let customer = state
        .ledger
        .record_partial_payment(&id, period, amount, details)
        .await?;

    Ok(ApiResponse::ok(customer, "Partial payment recorded successfully"))
}

pub async fn mark_all_paid(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<MarkAllPaidRequest>,
) -> Result<impl IntoResponse, AppError> {
    let period = request.into_period()?;
    let summary = state.ledger.mark_all_paid(period).await?;

    let message = format!(
        "Marked {} of {} customers as paid for {}",
        summary.updated_count, summary.total_customers, period
    );
    Ok(ApiResponse::ok(summary, message))
}

/// Run the monthly rollover now instead of waiting for the scheduler.
pub async fn run_rollover(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let report = state.rollover.run(Utc::now()).await?;
    Ok(ApiResponse::ok(report, "Rollover completed"))
}

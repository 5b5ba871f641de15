use chrono::{DateTime, Utc};
use futures::StreamExt;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

use super::metrics::record_ledger_operation;
use super::repository::CustomerRepository;
use crate::ledger::{self, BalanceView, LedgerError, PaymentDetails, Period, Settle};
use crate::models::Customer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllPaidSummary {
    pub total_customers: u64,
    pub updated_count: u64,
}

/// Load, apply a ledger transition, save. One customer document per call.
#[derive(Clone)]
pub struct LedgerService {
    repository: Arc<dyn CustomerRepository>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }

    pub async fn initialize_month(
        &self,
        customer_id: &str,
        period: Period,
        date: DateTime<Utc>,
    ) -> Result<Customer, AppError> {
        self.apply("initialize_month", customer_id, |customer| {
            ledger::initialize_month(customer, period, date);
            Ok(())
        })
        .await
    }

    pub async fn record_payment(
        &self,
        customer_id: &str,
        period: Period,
        settle: Settle,
        details: PaymentDetails,
    ) -> Result<Customer, AppError> {
        let now = Utc::now();
        self.apply("record_payment", customer_id, |customer| {
            ledger::record_payment(customer, period, settle, details, now)
        })
        .await
    }

    pub async fn record_partial_payment(
        &self,
        customer_id: &str,
        period: Period,
        amount: Decimal,
        details: PaymentDetails,
    ) -> Result<Customer, AppError> {
        let now = Utc::now();
        self.apply("record_partial_payment", customer_id, |customer| {
            ledger::record_partial_payment(customer, period, amount, details, now)
        })
        .await
    }

    pub async fn balance(&self, customer_id: &str, period: Period) -> Result<BalanceView, AppError> {
        let customer = self.load(customer_id).await?;
        Ok(ledger::balance_view(&customer, period))
    }

    /// Force `period` fully paid for every active customer. A customer that fails to
    /// load or save is logged and skipped; the batch carries on.
    pub async fn mark_all_paid(&self, period: Period) -> Result<MarkAllPaidSummary, AppError> {
        let now = Utc::now();
        let mut customers = self.repository.stream_active().await?;
        let mut summary = MarkAllPaidSummary {
            total_customers: 0,
            updated_count: 0,
        };

        while let Some(next) = customers.next().await {
            summary.total_customers += 1;

            let result = match next {
                Ok(mut customer) => {
                    ledger::mark_paid(&mut customer, period, now);
                    customer.touch(now);
                    self.repository.save(&customer).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    summary.updated_count += 1;
                    record_ledger_operation("mark_paid", true);
                }
                Err(e) => {
                    record_ledger_operation("mark_paid", false);
                    tracing::error!(period = %period, error = %e, "Failed to mark customer paid");
                }
            }
        }

        tracing::info!(
            period = %period,
            total = summary.total_customers,
            updated = summary.updated_count,
            "Marked active customers paid"
        );
        Ok(summary)
    }

    /// Active customers whose row for `period` exists and still has something owing.
    pub async fn pending_payments(&self, period: Period) -> Result<u64, AppError> {
        let mut customers = self.repository.stream_active().await?;
        let mut pending = 0;
        while let Some(customer) = customers.next().await {
            let customer = customer?;
            if customer
                .ledger
                .get(period)
                .is_some_and(|entry| !entry.is_fully_paid())
            {
                pending += 1;
            }
        }
        Ok(pending)
    }

    async fn load(&self, customer_id: &str) -> Result<Customer, AppError> {
        self.repository
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))
    }

    async fn apply<F>(
        &self,
        operation: &'static str,
        customer_id: &str,
        transition: F,
    ) -> Result<Customer, AppError>
    where
        F: FnOnce(&mut Customer) -> Result<(), LedgerError> + Send,
    {
        let result = async {
            let mut customer = self.load(customer_id).await?;
            transition(&mut customer)?;
            customer.touch(Utc::now());
            self.repository.save(&customer).await?;
            Ok::<_, AppError>(customer)
        }
        .await;

        record_ledger_operation(operation, result.is_ok());
        match &result {
            Ok(_) => tracing::info!(customer_id = %customer_id, operation, "Ledger updated"),
            Err(e) => tracing::warn!(customer_id = %customer_id, operation, error = %e, "Ledger update failed"),
        }
        result
    }
}

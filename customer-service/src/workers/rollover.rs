//! Monthly rollover: give every active customer a row for the current period.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

use crate::ledger::{self, Period};
use crate::services::metrics::{record_rollover_customers, record_rollover_run};
use crate::services::CustomerRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverReport {
    pub period: Period,
    pub scanned: u64,
    pub initialized: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RolloverReport {
    fn new(period: Period) -> Self {
        Self {
            period,
            scanned: 0,
            initialized: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

#[derive(Clone)]
pub struct RolloverJob {
    repository: Arc<dyn CustomerRepository>,
}

impl RolloverJob {
    pub fn new(repository: Arc<dyn CustomerRepository>) -> Self {
        Self { repository }
    }

    /// Initialize the period containing `now` for each active customer lacking it.
    ///
    /// Customers that already have the row are skipped, so repeated runs within a period
    /// are no-ops. A customer that fails to load or save is counted and the run carries
    /// on; the next run picks it up again.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RolloverReport, AppError> {
        let period = Period::from_date(&now);
        let mut report = RolloverReport::new(period);
        record_rollover_run();

        tracing::info!(period = %period, backend = self.repository.backend(), "Starting monthly rollover");
        let mut customers = self.repository.stream_active().await?;

        while let Some(next) = customers.next().await {
            report.scanned += 1;

            let mut customer = match next {
                Ok(customer) => customer,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(period = %period, error = %e, "Failed to read customer during rollover");
                    continue;
                }
            };

            if customer.ledger.contains(period) {
                report.skipped += 1;
                continue;
            }

            ledger::initialize_month(&mut customer, period, now);
            customer.touch(now);

            match self.repository.save(&customer).await {
                Ok(()) => {
                    report.initialized += 1;
                    tracing::debug!(customer_id = %customer.id, period = %period, "Initialized period");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        customer_id = %customer.id,
                        period = %period,
                        error = %e,
                        "Failed to initialize period"
                    );
                }
            }
        }

        record_rollover_customers("initialized", report.initialized);
        record_rollover_customers("skipped", report.skipped);
        record_rollover_customers("failed", report.failed);
        tracing::info!(
            period = %period,
            scanned = report.scanned,
            initialized = report.initialized,
            skipped = report.skipped,
            failed = report.failed,
            "Monthly rollover finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Customer, CustomerStatus};
    use crate::services::InMemoryCustomerRepository;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_run_initializes_then_skips() {
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let mut active = Customer::new("Bea", "0780", "Pine 3");
        active.monthly_fee = dec!(60);
        let mut inactive = Customer::new("Cal", "0781", "Pine 4");
        inactive.status = CustomerStatus::Inactive;
        repository.insert(&active).await.unwrap();
        repository.insert(&inactive).await.unwrap();

        let job = RolloverJob::new(repository.clone());
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 1, 0).unwrap();

        let first = job.run(now).await.unwrap();
        assert_eq!((first.scanned, first.initialized, first.skipped, first.failed), (1, 1, 0, 0));
        assert_eq!(first.period.to_string(), "2024-05");

        let second = job.run(now).await.unwrap();
        assert_eq!((second.scanned, second.initialized, second.skipped, second.failed), (1, 0, 1, 0));

        let stored = repository.find_by_id(&active.id).await.unwrap().unwrap();
        assert_eq!(stored.ledger.len(), 1);
        assert_eq!(stored.ledger.get(first.period).unwrap().total_due(), dec!(60));

        let untouched = repository.find_by_id(&inactive.id).await.unwrap().unwrap();
        assert!(untouched.ledger.is_empty());
    }
}

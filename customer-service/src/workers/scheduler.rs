use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::RolloverJob;

/// Runs the rollover once on start, then every day at `run_at` (UTC) until stopped.
pub struct DailyScheduler {
    job: RolloverJob,
    run_at: NaiveTime,
    shutdown_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DailyScheduler {
    pub fn new(job: RolloverJob, run_at: NaiveTime) -> Self {
        Self {
            job,
            run_at,
            shutdown_token: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("Rollover scheduler already started");
            return;
        }

        let job = self.job.clone();
        let run_at = self.run_at;
        let shutdown = self.shutdown_token.clone();

        tracing::info!(run_at = %run_at, "Starting rollover scheduler");
        self.handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = run_once(&job) => {}
            }

            loop {
                let now = Utc::now();
                let wait = until(now, next_run_after(now, run_at));

                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Rollover scheduler shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(wait) => run_once(&job).await,
                }
            }
        }));
    }

    /// Cancel the loop and wait for an in-flight run to wind down.
    pub async fn stop(mut self) {
        self.shutdown_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Rollover scheduler task failed");
            }
        }
    }
}

async fn run_once(job: &RolloverJob) {
    if let Err(e) = job.run(Utc::now()).await {
        tracing::error!(error = %e, "Monthly rollover failed");
    }
}

/// The first `run_at` strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(run_at).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

fn until(now: DateTime<Utc>, next: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use crate::services::{CustomerRepository, InMemoryCustomerRepository};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, day, hour, minute, 0).unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_after(at(10, 0, 0), time(0, 1)), at(10, 0, 1));
    }

    #[test]
    fn test_next_run_tomorrow_once_passed() {
        assert_eq!(next_run_after(at(10, 0, 1), time(0, 1)), at(11, 0, 1));
        assert_eq!(next_run_after(at(10, 23, 59), time(0, 1)), at(11, 0, 1));
    }

    #[test]
    fn test_next_run_crosses_year_end() {
        let new_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(next_run_after(at(31, 12, 0), time(0, 1)), new_year);
    }

    #[tokio::test]
    async fn test_start_runs_immediately_and_stop_returns() {
        let repository = Arc::new(InMemoryCustomerRepository::new());
        let customer = Customer::new("Dee", "0790", "Cedar 8");
        repository.insert(&customer).await.unwrap();

        let mut scheduler = DailyScheduler::new(RolloverJob::new(repository.clone()), time(0, 1));
        scheduler.start();

        let mut initialized = false;
        for _ in 0..50 {
            let stored = repository.find_by_id(&customer.id).await.unwrap().unwrap();
            if !stored.ledger.is_empty() {
                initialized = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        scheduler.stop().await;

        assert!(initialized, "startup run should initialize the current period");
    }
}

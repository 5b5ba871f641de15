use service_core::error::AppError;
use thiserror::Error;

/// Rejections raised by ledger operations before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("Valid payment amount is required")]
    NonPositiveAmount,

    #[error("Paid amount cannot be negative")]
    NegativePaid,
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

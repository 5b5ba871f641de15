//! Monthly billing ledger: period keys, per-period rows, carry-over arithmetic and the
//! transitions that payments and the monthly rollover apply.

pub mod balance;
pub mod error;
pub mod operations;
pub mod period;
pub mod state;

pub use balance::{balance_view, previous_balance, previous_period_key, total_due, BalanceView};
pub use error::LedgerError;
pub use operations::{
    initialize_month, mark_paid, record_partial_payment, record_payment, PaymentDetails, Settle,
};
pub use period::Period;
pub use state::{Ledger, LedgerEntry, PaymentMethod, Receipt};

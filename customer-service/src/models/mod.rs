pub mod customer;
pub mod document;

pub use customer::{Customer, CustomerStatus};
pub use document::{CustomerDocument, LegacyPayment, MonthlyPaymentRow, PaymentHistoryEntry};

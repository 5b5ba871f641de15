pub mod customers;
pub mod payments;

pub use customers::{CreateCustomerRequest, CustomerStats, UpdateCustomerRequest};
pub use payments::{
    InitializeMonthRequest, MarkAllPaidRequest, PaidValue, PartialPaymentRequest,
    RecordPaymentRequest,
};

pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod mongo;
pub mod repository;

pub use ledger::{LedgerService, MarkAllPaidSummary};
pub use memory::InMemoryCustomerRepository;
pub use metrics::{get_metrics, init_metrics};
pub use mongo::MongoCustomerRepository;
pub use repository::{CustomerFilter, CustomerRepository};

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod services;
pub mod startup;
pub mod workers;

pub use startup::{build_router, AppState, Application};

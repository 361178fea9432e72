pub mod errors;
pub mod ledger;
pub mod membership;
pub mod models;
pub mod services;

pub mod config;
pub mod history;
pub mod performance;
pub mod price;

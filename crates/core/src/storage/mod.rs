pub mod format;
pub mod report_store;

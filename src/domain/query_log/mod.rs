//! Query log domain - audit trail of gateway query executions

mod entity;
mod repository;

pub use entity::{QueryLogEntry, QueryLogId, QueryLogStatus};
pub use repository::QueryLogRepository;

//! Query domain - OLAP request/result types, error taxonomy and payload predicates

mod error;
mod payload;
mod request;

pub use error::{ErrorCategory, QueryError};
pub use payload::{looks_like_protocol_fault, sanitize_payload, PROTOCOL_FAULT_MARKER};
pub use request::{OlapRequest, OlapResult, QueryUser};

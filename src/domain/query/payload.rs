//! Raw payload predicates and post-processing

/// Substring marking a SOAP fault inside an otherwise successful XMLA response
pub const PROTOCOL_FAULT_MARKER: &str = "SOAP-ENV:Fault";

/// Returns true when the payload encodes a protocol-level fault.
///
/// A faulty payload is still a valid result for the caller, but it must never be cached.
pub fn looks_like_protocol_fault(payload: &str) -> bool {
    payload.contains(PROTOCOL_FAULT_MARKER)
}

/// Replaces NUL characters emitted by the embedded engine with `-`
pub fn sanitize_payload(payload: String) -> String {
    if payload.contains('\u{0000}') {
        payload.replace('\u{0000}', "-")
    } else {
        payload
    }
}

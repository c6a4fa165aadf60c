//! OLAP infrastructure - XMLA transport and request envelopes

mod envelope;
mod transport;

pub use envelope::execute_envelope;
pub use transport::{
    classify_error, HttpXmlaTransport, XmlaHttpRequest, XmlaTransport, ROLE_HEADER, XMLA_ACCEPT,
    XMLA_CONTENT_TYPE,
};

#[cfg(test)]
pub use transport::mock;

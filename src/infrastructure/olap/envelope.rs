//! XMLA Execute envelope

use quick_xml::escape::escape;

/// Wraps an MDX statement in an XMLA `Execute` request against a catalog
pub fn execute_envelope(statement: &str, catalog: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<SOAP-ENV:Body>",
            r#"<Execute xmlns="urn:schemas-microsoft-com:xml-analysis">"#,
            "<Command><Statement>{statement}</Statement></Command>",
            "<Properties><PropertyList>",
            "<Catalog>{catalog}</Catalog>",
            "<Format>Multidimensional</Format>",
            "<AxisFormat>TupleFormat</AxisFormat>",
            "</PropertyList></Properties>",
            "</Execute>",
            "</SOAP-ENV:Body>",
            "</SOAP-ENV:Envelope>"
        ),
        statement = escape(statement),
        catalog = escape(catalog),
    )
}

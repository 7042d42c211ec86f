use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::BTreeMap;

/// Query parameter name → value. Keys are unique; serialization follows key order.
pub type QueryParameters = BTreeMap<String, String>;

/// RFC 3986 unreserved characters stay literal, everything else is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// How keys and values are written into the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryEncoding {
    /// Inserted as given, no escaping
    #[default]
    Verbatim,
    /// Percent-encoded outside the unreserved set
    Percent,
}

/// Join parameters as `k1=v1&k2=v2`.
///
/// Returns an empty string for an empty map.
pub fn serialize_query(params: &QueryParameters, encoding: QueryEncoding) -> String {
    params
        .iter()
        .map(|(key, value)| match encoding {
            QueryEncoding::Verbatim => format!("{}={}", key, value),
            QueryEncoding::Percent => format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            ),
        })
        .collect::<Vec<_>>()
        .join("&")
}

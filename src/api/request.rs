use reqwest::Url;
use std::sync::mpsc;

use super::category::SearchCategory;
use super::client::{ClientError, GetRequest, HttpGet, HttpResponse};
use super::query::{QueryEncoding, QueryParameters, serialize_query};

/// Placeholder stored when an override is cleared. Never parses as a URL.
const MISSING_URL_PLACEHOLDER: &str = " ";
const HTTPS_PREFIX: &str = "https:";

/// A places request: category, optional query parameters, and the URL they resolve to.
///
/// The URL is resolved once at construction. For [`SearchCategory::Custom`] it
/// stays empty until [`PlacesRequest::set_custom_url`] runs; prefer
/// [`PlacesRequest::custom`], which does both steps at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacesRequest {
    category: SearchCategory,
    parameters: Option<QueryParameters>,
    resolved_url: String,
}

impl PlacesRequest {
    /// Resolve `category`'s endpoint with `parameters` appended verbatim.
    pub fn new(category: SearchCategory, parameters: Option<QueryParameters>) -> Self {
        Self::with_encoding(category, parameters, QueryEncoding::Verbatim)
    }

    pub fn with_encoding(
        category: SearchCategory,
        parameters: Option<QueryParameters>,
        encoding: QueryEncoding,
    ) -> Self {
        let mut resolved_url = category.base_url().to_string();

        if let Some(params) = parameters.as_ref().filter(|p| !p.is_empty()) {
            resolved_url.push('?');
            resolved_url.push_str(&serialize_query(params, encoding));
        }

        Self {
            category,
            parameters,
            resolved_url,
        }
    }

    /// Custom request with its URL supplied up front.
    pub fn custom(url: &str) -> Self {
        let mut request = Self::new(SearchCategory::Custom, None);
        request.set_custom_url(Some(url));
        request
    }

    /// Replace the resolved URL.
    ///
    /// `None` stores a single-space placeholder. A URL without `https:`
    /// anywhere in it gets `https:` prepended, so `//host/path` becomes
    /// `https://host/path`. Query parameters from construction are not
    /// re-applied.
    pub fn set_custom_url(&mut self, url: Option<&str>) {
        self.resolved_url = match url {
            None => MISSING_URL_PLACEHOLDER.to_string(),
            Some(u) if u.contains(HTTPS_PREFIX) => u.to_string(),
            Some(u) => format!("{}{}", HTTPS_PREFIX, u),
        };
    }

    pub fn category(&self) -> SearchCategory {
        self.category
    }

    pub fn parameters(&self) -> Option<&QueryParameters> {
        self.parameters.as_ref()
    }

    pub fn resolved_url(&self) -> &str {
        &self.resolved_url
    }

    /// Issue the GET through `client` and hand the body to `on_complete`.
    ///
    /// Returns without waiting for the network. `on_complete` receives
    /// `None` when the URL is not a well-formed absolute URI (in which case it runs before this
    /// returns and `client` is never called), on any client error, or when
    /// the body is empty. Status codes are not inspected.
    pub fn fetch<C, F>(&self, client: &C, on_complete: F)
    where
        C: HttpGet + ?Sized,
        F: FnOnce(Option<Vec<u8>>) + Send + 'static,
    {
        let url = match parse_absolute(&self.resolved_url) {
            Ok(url) => url,
            Err(reason) => {
                tracing::warn!(
                    category = %self.category,
                    url = %self.resolved_url,
                    error = %reason,
                    "not fetching: invalid URL"
                );
                on_complete(None);
                return;
            }
        };

        tracing::debug!(category = %self.category, url = %url, "fetching");
        client.get(
            GetRequest::new(url),
            Box::new(move |outcome| on_complete(body_from(outcome))),
        );
    }

    /// Like [`fetch`](Self::fetch), delivering the single result on a channel.
    pub fn fetch_channel<C>(&self, client: &C) -> mpsc::Receiver<Option<Vec<u8>>>
    where
        C: HttpGet + ?Sized,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.fetch(client, move |body| {
            // The receiver may already be gone; nothing left to notify then.
            let _ = tx.send(body);
        });
        rx
    }

    /// Fetch and wait for the result on the current thread.
    pub fn fetch_blocking<C>(&self, client: &C) -> Option<Vec<u8>>
    where
        C: HttpGet + ?Sized,
    {
        self.fetch_channel(client).recv().ok().flatten()
    }
}

/// Parse `raw` as an absolute URL without letting the parser repair it.
///
/// Only RFC 3986 characters are accepted and every `%` must start a valid
/// escape, so a verbatim query either reaches the wire unchanged or is refused.
fn parse_absolute(raw: &str) -> Result<Url, String> {
    if let Some(bad) = raw.chars().find(|c| !is_uri_char(*c)) {
        return Err(format!("illegal character {:?}", bad));
    }

    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(format!("malformed percent escape at byte {}", i));
        }
    }

    Url::parse(raw).map_err(|e| e.to_string())
}

fn is_uri_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~:/?#[]@!$&'()*+,;=%".contains(c)
}

fn body_from(outcome: Result<HttpResponse, ClientError>) -> Option<Vec<u8>> {
    match outcome {
        Ok(response) if response.body.is_empty() => {
            tracing::debug!(status = response.status, "response had no body");
            None
        }
        Ok(response) => {
            tracing::debug!(
                status = response.status,
                bytes = response.body.len(),
                "fetch complete"
            );
            Some(response.body)
        }
        Err(e) => {
            tracing::warn!(error = %e, "fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::category::{NEARBY_SEARCH_URL, PLACE_DETAILS_URL, PLACE_PHOTO_URL};
    use crate::api::client::testing::RecordingClient;
    use std::time::Duration;

    fn params(pairs: &[(&str, &str)]) -> QueryParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn wait(rx: mpsc::Receiver<Option<Vec<u8>>>) -> Option<Vec<u8>> {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_without_parameters() {
        for (category, expected) in [
            (SearchCategory::Nearby, NEARBY_SEARCH_URL),
            (SearchCategory::Detail, PLACE_DETAILS_URL),
            (SearchCategory::Photo, PLACE_PHOTO_URL),
        ] {
            let request = PlacesRequest::new(category, None);
            assert_eq!(request.resolved_url(), expected);
            assert!(!request.resolved_url().ends_with('?'));
        }
    }

    #[test]
    fn test_empty_parameters_add_no_query() {
        let request = PlacesRequest::new(SearchCategory::Detail, Some(QueryParameters::new()));
        assert_eq!(request.resolved_url(), PLACE_DETAILS_URL);
    }

    #[test]
    fn test_nearby_with_parameters() {
        let request = PlacesRequest::new(
            SearchCategory::Nearby,
            Some(params(&[("key", "abcdef"), ("location", "1,2")])),
        );

        let url = request.resolved_url();
        let query = url
            .strip_prefix(NEARBY_SEARCH_URL)
            .and_then(|rest| rest.strip_prefix('?'))
            .unwrap();
        assert!(query == "key=abcdef&location=1,2" || query == "location=1,2&key=abcdef");
        assert_eq!(query.matches("key=abcdef").count(), 1);
        assert_eq!(query.matches("location=1,2").count(), 1);
    }

    #[test]
    fn test_percent_encoded_parameters() {
        let request = PlacesRequest::with_encoding(
            SearchCategory::Nearby,
            Some(params(&[("location", "1,2")])),
            QueryEncoding::Percent,
        );
        assert_eq!(
            request.resolved_url(),
            format!("{}?location=1%2C2", NEARBY_SEARCH_URL)
        );
    }

    #[test]
    fn test_custom_is_empty_until_overridden() {
        let request = PlacesRequest::new(SearchCategory::Custom, Some(params(&[("q", "x")])));
        assert_eq!(request.resolved_url(), "");
        assert_eq!(request.parameters().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_set_custom_url_prefixes_scheme() {
        let mut request = PlacesRequest::new(SearchCategory::Custom, None);
        request.set_custom_url(Some("//maps.example.com/x"));
        assert_eq!(request.resolved_url(), "https://maps.example.com/x");
    }

    #[test]
    fn test_set_custom_url_keeps_https() {
        let mut request = PlacesRequest::new(SearchCategory::Custom, None);
        request.set_custom_url(Some("https://maps.example.com/x"));
        assert_eq!(request.resolved_url(), "https://maps.example.com/x");

        request.set_custom_url(Some("proxy?target=https://maps.example.com"));
        assert_eq!(request.resolved_url(), "proxy?target=https://maps.example.com");
    }

    #[test]
    fn test_set_custom_url_does_not_normalize_http() {
        let mut request = PlacesRequest::new(SearchCategory::Custom, None);
        request.set_custom_url(Some("http://maps.example.com/x"));
        assert_eq!(request.resolved_url(), "https:http://maps.example.com/x");
    }

    #[test]
    fn test_set_custom_url_none_uses_placeholder() {
        let mut request = PlacesRequest::new(SearchCategory::Custom, None);
        request.set_custom_url(None);
        assert_eq!(request.resolved_url(), " ");
    }

    #[test]
    fn test_override_drops_query_parameters() {
        let mut request = PlacesRequest::new(
            SearchCategory::Nearby,
            Some(params(&[("key", "abcdef")])),
        );
        request.set_custom_url(Some("https://maps.example.com/x"));
        assert_eq!(request.resolved_url(), "https://maps.example.com/x");
        assert_eq!(request.category(), SearchCategory::Nearby);
    }

    #[test]
    fn test_custom_constructor() {
        let request = PlacesRequest::custom("//maps.example.com/x?q=1");
        assert_eq!(request.category(), SearchCategory::Custom);
        assert_eq!(request.resolved_url(), "https://maps.example.com/x?q=1");
    }

    #[test]
    fn test_fetch_invalid_urls_skip_client() {
        let client = RecordingClient::ok(200, b"unused");

        let mut placeholder = PlacesRequest::new(SearchCategory::Custom, None);
        placeholder.set_custom_url(None);

        for request in [
            PlacesRequest::new(SearchCategory::Custom, None),
            placeholder,
            PlacesRequest::new(SearchCategory::Custom, None).with_raw_url("not a url"),
        ] {
            let (tx, rx) = mpsc::channel();
            request.fetch(&client, move |body| tx.send(body).unwrap());
            // Delivered before fetch returned.
            assert_eq!(rx.try_recv().unwrap(), None);
        }

        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_fetch_delivers_body_once() {
        let client = RecordingClient::ok(200, br#"{"status":"OK"}"#);
        let request =
            PlacesRequest::new(SearchCategory::Detail, Some(params(&[("place_id", "p1")])));

        let (tx, rx) = mpsc::channel();
        request.fetch(&client, move |body| tx.send(body).unwrap());

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Some(br#"{"status":"OK"}"#.to_vec())
        );
        // The sender was consumed with the callback, so the channel closes after one value.
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_fetch_sends_plain_get() {
        let client = RecordingClient::ok(200, b"x");
        let request =
            PlacesRequest::new(SearchCategory::Photo, Some(params(&[("maxwidth", "400")])));
        wait(request.fetch_channel(&client));

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.as_str(),
            format!("{}?maxwidth=400", PLACE_PHOTO_URL)
        );
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
        assert_eq!(
            requests[0].cache,
            crate::api::client::CachePolicy::ReloadIgnoringLocalCache
        );
    }

    #[test]
    fn test_fetch_refuses_url_the_parser_would_rewrite() {
        let client = RecordingClient::ok(200, b"unused");

        let spaced = PlacesRequest::new(
            SearchCategory::Nearby,
            Some(params(&[("keyword", "fish & chips café")])),
        );
        let bad_escape = PlacesRequest::custom("https://maps.example.com/x?q=100%");

        for request in [spaced, bad_escape] {
            let (tx, rx) = mpsc::channel();
            request.fetch(&client, move |body| tx.send(body).unwrap());
            assert_eq!(rx.try_recv().unwrap(), None);
        }
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_fetch_sends_resolved_url_unchanged() {
        let client = RecordingClient::ok(200, b"x");
        let verbatim = PlacesRequest::new(
            SearchCategory::Nearby,
            Some(params(&[("key", "abcdef"), ("location", "-33.86,151.19")])),
        );
        let encoded = PlacesRequest::with_encoding(
            SearchCategory::Nearby,
            Some(params(&[("keyword", "fish & chips café")])),
            QueryEncoding::Percent,
        );

        for request in [&verbatim, &encoded] {
            assert!(request.fetch_blocking(&client).is_some());
        }

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.as_str(), verbatim.resolved_url());
        assert_eq!(requests[1].url.as_str(), encoded.resolved_url());
        assert!(encoded.resolved_url().ends_with("keyword=fish%20%26%20chips%20caf%C3%A9"));
    }

    #[test]
    fn test_fetch_ignores_error_status() {
        let client = RecordingClient::ok(500, b"server exploded");
        let request = PlacesRequest::custom("https://maps.example.com/x");
        assert_eq!(
            wait(request.fetch_channel(&client)),
            Some(b"server exploded".to_vec())
        );
    }

    #[test]
    fn test_fetch_client_error_yields_none() {
        let client = RecordingClient::failing();
        let request = PlacesRequest::new(SearchCategory::Nearby, None);
        assert_eq!(wait(request.fetch_channel(&client)), None);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_fetch_empty_body_yields_none() {
        let client = RecordingClient::ok(200, b"");
        let request = PlacesRequest::new(SearchCategory::Nearby, None);
        assert_eq!(request.fetch_blocking(&client), None);
    }

    #[test]
    fn test_fetch_blocking_returns_body() {
        let client = RecordingClient::ok(404, b"missing");
        let request = PlacesRequest::new(SearchCategory::Detail, None);
        assert_eq!(request.fetch_blocking(&client), Some(b"missing".to_vec()));
    }

    impl PlacesRequest {
        fn with_raw_url(mut self, url: &str) -> Self {
            self.resolved_url = url.to_string();
            self
        }
    }
}

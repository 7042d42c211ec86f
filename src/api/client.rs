use reqwest::Url;
use std::thread;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("placesfetch/", env!("CARGO_PKG_VERSION"));

/// Timeout applied to every places request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no response received")]
    NoResponse,
    #[error("failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Local cache behaviour requested for a GET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Always go to the network, never serve from a local cache
    #[default]
    ReloadIgnoringLocalCache,
    UseProtocolCache,
}

/// A single GET: no headers, no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub url: Url,
    pub timeout: Duration,
    pub cache: CachePolicy,
}

impl GetRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: DEFAULT_TIMEOUT,
            cache: CachePolicy::ReloadIgnoringLocalCache,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One-shot completion handed to an [`HttpGet`] implementation.
pub type Completion = Box<dyn FnOnce(Result<HttpResponse, ClientError>) + Send + 'static>;

/// An HTTP collaborator capable of issuing GET requests.
///
/// Implementations own their execution context: `get` should return without
/// waiting on the network and must call `completion` exactly once, from
/// whichever thread finishes the request.
pub trait HttpGet: Send + Sync {
    fn get(&self, request: GetRequest, completion: Completion);
}

/// [`HttpGet`] backed by reqwest's blocking client, one worker thread per request.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_user_agent(USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpGet for ReqwestClient {
    fn get(&self, request: GetRequest, completion: Completion) {
        let client = self.client.clone();
        thread::spawn(move || completion(execute(&client, &request)));
    }
}

// reqwest keeps no local response cache, so `ReloadIgnoringLocalCache` needs nothing here.
fn execute(
    client: &reqwest::blocking::Client,
    request: &GetRequest,
) -> Result<HttpResponse, ClientError> {
    let response = client
        .get(request.url.clone())
        .timeout(request.timeout)
        .send()?;

    let status = response.status().as_u16();
    let body = response.bytes()?.to_vec();

    Ok(HttpResponse { status, body })
}

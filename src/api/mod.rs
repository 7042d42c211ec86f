pub mod category;
pub mod client;
pub mod query;
pub mod request;

pub use category::SearchCategory;
pub use client::{
    CachePolicy, ClientError, Completion, DEFAULT_TIMEOUT, GetRequest, HttpGet, HttpResponse,
    ReqwestClient,
};
pub use query::{QueryEncoding, QueryParameters, serialize_query};
pub use request::PlacesRequest;

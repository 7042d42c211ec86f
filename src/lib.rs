//! placesfetch - Build and issue GET requests against places search endpoints

pub mod api;
pub mod config;

pub use api::{
    ClientError, HttpGet, HttpResponse, PlacesRequest, QueryEncoding, QueryParameters,
    ReqwestClient, SearchCategory,
};

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

pub const NEARBY_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
pub const PLACE_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
pub const PLACE_PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";

/// Which places endpoint a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchCategory {
    /// Places around a location
    #[default]
    Nearby,
    /// Caller-supplied URL, set through an override
    Custom,
    /// Details for a single place
    Detail,
    /// Photo bytes for a place photo reference
    Photo,
}

impl SearchCategory {
    /// Fixed base endpoint for this category.
    ///
    /// `Custom` has no endpoint and yields an empty string.
    pub fn base_url(self) -> &'static str {
        match self {
            SearchCategory::Nearby => NEARBY_SEARCH_URL,
            SearchCategory::Detail => PLACE_DETAILS_URL,
            SearchCategory::Photo => PLACE_PHOTO_URL,
            SearchCategory::Custom => "",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchCategory::Nearby => "nearby",
            SearchCategory::Custom => "custom",
            SearchCategory::Detail => "detail",
            SearchCategory::Photo => "photo",
        };
        f.write_str(name)
    }
}

//! Hotel lookup: turning a [`HotelRef`] into a [`HotelRecord`].

use async_trait::async_trait;
use hotelpress_http::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;
use time::Date;
use url::Url;

use super::models::{HotelRecord, HotelRef};
use crate::utils::{as_count, as_flag, as_number, as_text, first_match, upstream_body};

/// Query parameters that carry a hotel id on affiliate/booking URLs.
const ID_QUERY_PARAMS: &[&str] = &["hid", "hotel_id", "hotelId", "hotel"];

static PAGE_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""hotelId"\s*:\s*"?(\d+)"#,
        r#"data-hotel-id\s*=\s*["'](\d+)["']"#,
        r"[?&;]hotel_?id=(\d+)",
        r"[?&;]hid=(\d+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

const RESULT_LISTS: &[&str] = &["/results", "/result", "/hotels", "/data"];
const ID_FIELDS: &[&str] = &["/hotelId", "/hotel_id", "/propertyId", "/id"];
const NAME_FIELDS: &[&str] = &["/hotelName", "/name", "/propertyName", "/hotel_name"];
const IMAGE_FIELDS: &[&str] = &["/imageURL", "/imageUrl", "/image", "/photoUrl", "/thumbnail"];
const REVIEW_SCORE_FIELDS: &[&str] = &["/reviewScore", "/rating", "/review_score"];
const REVIEW_COUNT_FIELDS: &[&str] = &["/reviewCount", "/numberOfReviews", "/review_count"];
const STAR_FIELDS: &[&str] = &["/starRating", "/stars", "/star_rating"];
const RATE_FIELDS: &[&str] = &["/dailyRate", "/price", "/rate", "/lowestRate"];
const CROSSED_OUT_FIELDS: &[&str] = &["/crossedOutRate", "/originalRate"];
const CURRENCY_FIELDS: &[&str] = &["/currency", "/currencyCode"];
const CITY_FIELDS: &[&str] = &["/city", "/cityName", "/address/city"];
const COUNTRY_FIELDS: &[&str] = &["/country", "/countryName", "/address/country"];
const LANDING_FIELDS: &[&str] = &["/landingURL", "/landingUrl", "/url", "/deeplink", "/link"];
const WIFI_FIELDS: &[&str] = &["/freeWifi", "/free_wifi"];
const BREAKFAST_FIELDS: &[&str] = &["/includeBreakfast", "/breakfastIncluded"];

/// What the affiliate search is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Hotel(u64),
    City(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub target: SearchTarget,
    pub check_in: Date,
    pub check_out: Date,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("affiliate API is not configured")]
    NotConfigured(Vec<String>),

    #[error("affiliate API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("affiliate API answered HTTP {status}")]
    Status { status: u16, body: String },

    #[error("affiliate API reported an error: {message}")]
    Rejected { message: String, body: Value },

    #[error("affiliate API response could not be decoded: {0}")]
    Decode(String),

    #[error("hotel page answered HTTP {status}")]
    PageStatus { url: String, status: u16 },

    #[error("{0}")]
    NotFound(String),

    #[error("hotel record has no {0}")]
    Incomplete(&'static str),
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        const CODE: &str = "upstream_lookup_error";
        let message = err.to_string();
        match err {
            LookupError::NotConfigured(missing) => AppError::configuration(missing),
            LookupError::NotFound(message) => AppError::not_found(Vec::new(), message),
            LookupError::Status { status, body } => AppError::upstream(
                CODE,
                vec![json!({ "upstream_status": status, "body": upstream_body(&body) })],
                message,
            ),
            LookupError::Rejected { body, .. } => AppError::upstream(
                CODE,
                vec![json!({ "upstream_status": 200, "body": body })],
                message,
            ),
            LookupError::PageStatus { url, status } => AppError::upstream(
                CODE,
                vec![json!({ "upstream_status": status, "url": url })],
                message,
            ),
            LookupError::Transport(_) | LookupError::Decode(_) | LookupError::Incomplete(_) => {
                AppError::upstream(CODE, Vec::new(), message)
            }
        }
    }
}

/// Source of hotel data.
#[async_trait]
pub trait HotelSource: Send + Sync {
    /// Run one affiliate search and return its first result.
    async fn search(&self, criteria: &SearchCriteria) -> Result<HotelRecord, LookupError>;

    /// Fetch an HTML page, used to scrape a hotel id as a last resort.
    async fn fetch_page(&self, url: &Url) -> Result<String, LookupError>;
}

/// Work out what to search for. Only touches the network when a URL carries
/// no usable id in its query string.
pub async fn resolve_target(
    source: &dyn HotelSource,
    hotel: &HotelRef,
) -> Result<SearchTarget, LookupError> {
    match hotel {
        HotelRef::Id(id) => Ok(SearchTarget::Hotel(*id)),
        HotelRef::City(id) => Ok(SearchTarget::City(*id)),
        HotelRef::Url(url) => {
            if let Some(id) = hotel_id_from_query(url) {
                return Ok(SearchTarget::Hotel(id));
            }

            tracing::info!(url = %url, "no hotel id in URL query, scraping page");
            let page = source.fetch_page(url).await?;
            scrape_hotel_id(&page)
                .map(SearchTarget::Hotel)
                .ok_or_else(|| LookupError::NotFound(format!("no hotel id found at {url}")))
        }
    }
}

pub fn hotel_id_from_query(url: &Url) -> Option<u64> {
    ID_QUERY_PARAMS.iter().find_map(|param| {
        url.query_pairs()
            .find(|(key, _)| key == param)
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
    })
}

pub fn scrape_hotel_id(html: &str) -> Option<u64> {
    PAGE_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
            .find(|id| *id > 0)
    })
}

/// Extract the first hotel of an affiliate search response.
pub fn parse_search_response(response: &Value) -> Result<HotelRecord, LookupError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let message = first_match(error, &["/message", "/errorMessage", ""], as_text)
            .unwrap_or_else(|| error.to_string());
        return Err(LookupError::Rejected {
            message,
            body: response.clone(),
        });
    }

    let first = first_match(response, RESULT_LISTS, |list| list.as_array()?.first().cloned())
        .ok_or_else(|| LookupError::NotFound("affiliate API returned no hotels".to_string()))?;

    let name = first_match(&first, NAME_FIELDS, as_text).ok_or(LookupError::Incomplete("name"))?;

    Ok(HotelRecord {
        id: first_match(&first, ID_FIELDS, as_count),
        name,
        image_urls: image_urls(&first),
        review_score: first_match(&first, REVIEW_SCORE_FIELDS, as_number).filter(|s| *s > 0.0),
        review_count: first_match(&first, REVIEW_COUNT_FIELDS, as_count).filter(|c| *c > 0),
        star_rating: first_match(&first, STAR_FIELDS, as_number).filter(|s| *s > 0.0),
        daily_rate: first_match(&first, RATE_FIELDS, as_number).filter(|r| *r > 0.0),
        crossed_out_rate: first_match(&first, CROSSED_OUT_FIELDS, as_number).filter(|r| *r > 0.0),
        currency: first_match(&first, CURRENCY_FIELDS, as_text),
        city: first_match(&first, CITY_FIELDS, as_text),
        country: first_match(&first, COUNTRY_FIELDS, as_text),
        landing_url: first_match(&first, LANDING_FIELDS, as_text),
        free_wifi: first_match(&first, WIFI_FIELDS, as_flag),
        include_breakfast: first_match(&first, BREAKFAST_FIELDS, as_flag),
    })
}

fn image_urls(hotel: &Value) -> Vec<String> {
    let mut urls: Vec<String> = first_match(hotel, IMAGE_FIELDS, as_text).into_iter().collect();

    if let Some(images) = hotel.get("images").and_then(Value::as_array) {
        for image in images {
            let url = as_text(image).or_else(|| first_match(image, &["/url", "/imageUrl", "/src"], as_text));
            if let Some(url) = url {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
    }

    urls
}

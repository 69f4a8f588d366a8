use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};
use url::Url;

/// Inbound body of `POST /api/publishing/posts`.
///
/// Every field is optional at the wire level; the validator decides what is
/// required so that all problems are reported together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub keyword: Option<String>,
    pub hotel_id: Option<Identifier>,
    pub hotel_url: Option<String>,
    pub city_id: Option<Identifier>,
    pub version: Option<String>,
    pub publish_type: Option<String>,
    /// Older name of `publishType`; `publishType` wins when both are sent.
    pub status: Option<String>,
    pub category: Option<u64>,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub slug: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub focus_keyword: Option<String>,
    pub canonical_url: Option<String>,
    pub publish_at: Option<String>,
}

/// Numeric id sent either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(u64),
    Text(String),
}

/// Post status understood by the publish target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Publish,
    Future,
}

impl PublishStatus {
    /// Parse a status or one of its aliases.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "publish" | "published" | "live" => Some(Self::Publish),
            "future" | "scheduled" | "schedule" => Some(Self::Future),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Publish => "publish",
            Self::Future => "future",
        }
    }
}

/// Requested article template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersion {
    Short,
    Long,
    Random,
}

impl TemplateVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "short" | "v1" | "1" => Some(Self::Short),
            "long" | "v2" | "2" => Some(Self::Long),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

/// Concrete layout a document is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Short,
    Long,
}

/// How the hotel to write about is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotelRef {
    Id(u64),
    Url(Url),
    City(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub focus_keyword: Option<String>,
    pub canonical_url: Option<String>,
}

/// A validated, normalized publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub keyword: String,
    pub hotel: HotelRef,
    /// Kept even when an explicit id wins, as the fallback affiliate link.
    pub hotel_url: Option<Url>,
    pub version: TemplateVersion,
    pub status: PublishStatus,
    pub category: u64,
    pub check_in: Date,
    pub check_out: Date,
    /// Site-local schedule; only set for [`PublishStatus::Future`].
    pub publish_at: Option<PrimitiveDateTime>,
    pub slug: Option<String>,
    pub seo: SeoFields,
}

/// Hotel data consumed from the affiliate API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelRecord {
    pub id: Option<u64>,
    pub name: String,
    pub image_urls: Vec<String>,
    pub review_score: Option<f64>,
    pub review_count: Option<u64>,
    pub star_rating: Option<f64>,
    pub daily_rate: Option<f64>,
    pub crossed_out_rate: Option<f64>,
    pub currency: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub landing_url: Option<String>,
    pub free_wifi: Option<bool>,
    pub include_breakfast: Option<bool>,
}

impl HotelRecord {
    /// "City, Country", whichever parts are known.
    pub fn location(&self) -> Option<String> {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
            (None, None) => None,
        }
    }
}

/// Body sent to `wp/v2/posts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub status: PublishStatus,
    pub categories: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Site-local `YYYY-MM-DDTHH:MM:SS`, only for scheduled posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<&'static str, String>,
}

/// Subset of the publish target's answer returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub id: u64,
    #[serde(default)]
    pub link: Option<String>,
    pub status: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// Normalized inputs echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEcho {
    pub keyword: String,
    pub hotel_id: Option<u64>,
    pub hotel_name: String,
    pub version: TemplateVersion,
    pub layout: Layout,
    pub status: PublishStatus,
    pub category: u64,
    pub check_in_date: String,
    pub check_out_date: String,
    pub publish_at: Option<String>,
    pub slug: Option<String>,
    pub title: String,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub focus_keyword: Option<String>,
    pub canonical_url: Option<String>,
}

/// Successful response of the publishing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub resolved: ResolvedEcho,
    pub post: PublishResult,
}

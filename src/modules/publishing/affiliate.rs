//! HTTP client for the affiliate hotel-search API.

use std::time::Duration;

use async_trait::async_trait;
use hotelpress_kernel::settings::{env_var_name, AffiliateSettings};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{json, Value};
use url::Url;

use super::lookup::{parse_search_response, HotelSource, LookupError, SearchCriteria, SearchTarget};
use super::models::HotelRecord;
use super::validator::format_date;

/// Results requested for a city search; only the first is used.
const CITY_SEARCH_RESULTS: u32 = 10;

pub struct AffiliateClient {
    http: reqwest::Client,
    settings: AffiliateSettings,
}

impl AffiliateClient {
    pub fn new(settings: AffiliateSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hotelpress/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self { http, settings })
    }

    /// `{site_id}:{api_key}`, the affiliate API's own authorization scheme.
    fn authorization(&self) -> Result<String, LookupError> {
        let site_id = self
            .settings
            .site_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|v| !v.is_empty());

        match (site_id, api_key) {
            (Some(site_id), Some(api_key)) => Ok(format!("{site_id}:{api_key}")),
            (site_id, api_key) => {
                let mut missing = Vec::new();
                if site_id.is_none() {
                    missing.push(env_var_name("affiliate", "site_id"));
                }
                if api_key.is_none() {
                    missing.push(env_var_name("affiliate", "api_key"));
                }
                Err(LookupError::NotConfigured(missing))
            }
        }
    }

    fn search_body(&self, criteria: &SearchCriteria) -> Value {
        let mut additional = json!({
            "currency": self.settings.currency,
            "language": self.settings.language,
            "occupancy": {
                "numberOfAdult": self.settings.adults,
                "numberOfChildren": self.settings.children,
            },
        });

        let mut body = json!({
            "checkInDate": format_date(criteria.check_in),
            "checkOutDate": format_date(criteria.check_out),
        });

        match criteria.target {
            SearchTarget::Hotel(id) => {
                body["hotelId"] = json!([id]);
                additional["maxResult"] = json!(1);
            }
            SearchTarget::City(id) => {
                body["cityId"] = json!(id);
                additional["maxResult"] = json!(CITY_SEARCH_RESULTS);
                additional["sortBy"] = json!("Recommended");
            }
        }
        body["additional"] = additional;

        json!({ "criteria": body })
    }
}

#[async_trait]
impl HotelSource for AffiliateClient {
    async fn search(&self, criteria: &SearchCriteria) -> Result<HotelRecord, LookupError> {
        let authorization = self.authorization()?;

        tracing::info!(
            target_kind = ?criteria.target,
            check_in = %criteria.check_in,
            check_out = %criteria.check_out,
            "querying affiliate API"
        );

        let response = self
            .http
            .post(&self.settings.endpoint)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .json(&self.search_body(criteria))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "affiliate API answered with failure");
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))?;
        parse_search_response(&value)
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, LookupError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(LookupError::PageStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

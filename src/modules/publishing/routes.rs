//! HTTP surface of the publishing module.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use hotelpress_authz::{require_api_key, ApiKeyGuard};
use hotelpress_http::AppError;
use hotelpress_kernel::Settings;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use time::OffsetDateTime;
use url::Url;

use super::document::{build_document, compose_title, ArticleInput};
use super::lookup::{resolve_target, HotelSource, LookupError, SearchCriteria, SearchTarget};
use super::models::{PublishRequest, PublishResponse, ResolvedEcho};
use super::publisher::{draft_for, PostSink};
use super::validator::{format_date, format_local_datetime, validate, ContentDefaults};

/// Shared, read-only state of the publishing handlers.
#[derive(Clone)]
pub struct PublishingState {
    pub settings: Arc<Settings>,
    pub defaults: ContentDefaults,
    pub hotels: Arc<dyn HotelSource>,
    pub posts: Arc<dyn PostSink>,
}

impl PublishingState {
    pub fn new(
        settings: Arc<Settings>,
        hotels: Arc<dyn HotelSource>,
        posts: Arc<dyn PostSink>,
    ) -> Self {
        let defaults = ContentDefaults::from_settings(&settings);
        Self {
            settings,
            defaults,
            hotels,
            posts,
        }
    }

    /// Per-request RNG; seeded when `content.random_seed` is set.
    fn rng(&self) -> StdRng {
        match self.settings.content.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

pub fn router(state: PublishingState, guard: ApiKeyGuard) -> Router {
    Router::new()
        .route("/posts", post(create_post))
        .route_layer(middleware::from_fn_with_state(guard, require_api_key))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "publishing module is healthy"
}

/// Validate, look up the hotel, build the article and publish it.
async fn create_post(
    State(state): State<PublishingState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, AppError> {
    let missing = state.settings.missing_publishing_settings();
    if !missing.is_empty() {
        tracing::error!(missing = ?missing, "publishing is not fully configured");
        return Err(AppError::configuration(missing));
    }

    let Json(request) = payload.map_err(|rejection| {
        AppError::validation(
            vec![json!({ "field": "body", "error": rejection.body_text() })],
            "request body is not valid JSON",
        )
    })?;

    let resolved = validate(request, &state.defaults, OffsetDateTime::now_utc())?;
    tracing::info!(
        keyword = %resolved.keyword,
        hotel = ?resolved.hotel,
        status = resolved.status.as_str(),
        "publish request accepted"
    );

    let target = resolve_target(state.hotels.as_ref(), &resolved.hotel).await?;
    let criteria = SearchCriteria {
        target,
        check_in: resolved.check_in,
        check_out: resolved.check_out,
    };
    let hotel = state.hotels.search(&criteria).await?;

    let affiliate_link = hotel
        .landing_url
        .clone()
        .or_else(|| resolved.hotel_url.as_ref().map(Url::to_string))
        .ok_or(LookupError::Incomplete("affiliate link"))?;

    let mut rng = state.rng();
    let layout = resolved.version.resolve(&mut rng);
    let title = compose_title(&resolved.keyword, &hotel, &mut rng);
    let article = ArticleInput {
        keyword: &resolved.keyword,
        hotel: &hotel,
        affiliate_link: &affiliate_link,
    };
    let content = build_document(&article, layout).to_html();

    let draft = draft_for(&resolved, title.clone(), content);
    let post = state.posts.create_post(&draft).await?;

    let hotel_id = match target {
        SearchTarget::Hotel(id) => Some(id),
        SearchTarget::City(_) => hotel.id,
    };

    Ok(Json(PublishResponse {
        success: true,
        resolved: ResolvedEcho {
            keyword: resolved.keyword,
            hotel_id,
            hotel_name: hotel.name,
            version: resolved.version,
            layout,
            status: resolved.status,
            category: resolved.category,
            check_in_date: format_date(resolved.check_in),
            check_out_date: format_date(resolved.check_out),
            publish_at: resolved.publish_at.map(format_local_datetime),
            slug: resolved.slug,
            title,
            seo_title: resolved.seo.title,
            seo_description: resolved.seo.description,
            focus_keyword: resolved.seo.focus_keyword,
            canonical_url: resolved.seo.canonical_url,
        },
        post,
    }))
}

//! Publishing to a WordPress-compatible REST API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hotelpress_http::AppError;
use hotelpress_kernel::settings::{env_var_name, PublisherSettings};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::json;
use thiserror::Error;
use url::Url;

use super::models::{PostDraft, PublishResult, PublishStatus, ResolvedRequest};
use super::validator::format_local_datetime;
use crate::utils::upstream_body;

const POSTS_PATH: &str = "wp-json/wp/v2/posts";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish target is not configured")]
    NotConfigured(Vec<String>),

    #[error("publish target request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("publish target answered HTTP {status}")]
    Status { status: u16, body: String },

    #[error("publish target response could not be decoded: {0}")]
    Decode(String),
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        const CODE: &str = "upstream_publish_error";
        let message = err.to_string();
        match err {
            PublishError::NotConfigured(missing) => AppError::configuration(missing),
            PublishError::Status { status, body } => AppError::upstream(
                CODE,
                vec![json!({ "upstream_status": status, "body": upstream_body(&body) })],
                message,
            ),
            PublishError::Transport(_) | PublishError::Decode(_) => {
                AppError::upstream(CODE, Vec::new(), message)
            }
        }
    }
}

/// Destination for finished posts.
#[async_trait]
pub trait PostSink: Send + Sync {
    async fn create_post(&self, draft: &PostDraft) -> Result<PublishResult, PublishError>;
}

/// Build the post body for a resolved request and its rendered article.
pub fn draft_for(request: &ResolvedRequest, title: String, content: String) -> PostDraft {
    let seo = &request.seo;
    let mut meta = BTreeMap::new();
    let fields = [
        ("rank_math_title", &seo.title),
        ("rank_math_description", &seo.description),
        ("rank_math_focus_keyword", &seo.focus_keyword),
        ("rank_math_canonical_url", &seo.canonical_url),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            meta.insert(key, value.clone());
        }
    }

    let date = match request.status {
        PublishStatus::Future => request.publish_at.map(format_local_datetime),
        PublishStatus::Draft | PublishStatus::Publish => None,
    };

    PostDraft {
        title,
        content,
        status: request.status,
        categories: vec![request.category],
        slug: request.slug.clone(),
        date,
        excerpt: seo.description.clone(),
        meta,
    }
}

/// `Basic` credentials for a WordPress application password.
pub fn basic_token(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub struct WordPressClient {
    http: reqwest::Client,
    settings: PublisherSettings,
}

struct Target {
    endpoint: Url,
    authorization: String,
}

impl WordPressClient {
    pub fn new(settings: PublisherSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hotelpress/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self { http, settings })
    }

    fn target(&self) -> Result<Target, PublishError> {
        let base_url = present(self.settings.base_url.as_deref());
        let username = present(self.settings.username.as_deref());
        let password = self
            .settings
            .app_password
            .as_ref()
            .map(|p| p.expose_secret().as_str())
            .and_then(|p| present(Some(p)));

        let (Some(base_url), Some(username), Some(password)) = (base_url, username, password) else {
            let mut missing = Vec::new();
            if base_url.is_none() {
                missing.push(env_var_name("publisher", "base_url"));
            }
            if username.is_none() {
                missing.push(env_var_name("publisher", "username"));
            }
            if password.is_none() {
                missing.push(env_var_name("publisher", "app_password"));
            }
            return Err(PublishError::NotConfigured(missing));
        };

        let endpoint = posts_endpoint(base_url).ok_or_else(|| {
            tracing::warn!(base_url, "publisher base URL is not a valid URL");
            PublishError::NotConfigured(vec![env_var_name("publisher", "base_url")])
        })?;

        Ok(Target {
            endpoint,
            authorization: basic_token(username, password),
        })
    }
}

#[async_trait]
impl PostSink for WordPressClient {
    async fn create_post(&self, draft: &PostDraft) -> Result<PublishResult, PublishError> {
        let target = self.target()?;

        tracing::info!(
            endpoint = %target.endpoint,
            status = draft.status.as_str(),
            date = draft.date.as_deref(),
            "creating post"
        );

        let response = self
            .http
            .post(target.endpoint)
            .header(AUTHORIZATION, target.authorization)
            .header(ACCEPT, "application/json")
            .json(draft)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "publish target answered with failure");
            return Err(PublishError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: PublishResult =
            serde_json::from_str(&body).map_err(|e| PublishError::Decode(e.to_string()))?;
        tracing::info!(post_id = result.id, status = %result.status, "post created");
        Ok(result)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn posts_endpoint(base_url: &str) -> Option<Url> {
    let mut base = Url::parse(base_url).ok()?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(POSTS_PATH).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::publishing::models::{HotelRef, SeoFields, TemplateVersion};
    use crate::modules::publishing::test_support::serve;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use redact::Secret;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use time::macros::{date, datetime};

    type Captured = Arc<Mutex<Option<(HeaderMap, Value)>>>;

    fn resolved(status: PublishStatus) -> ResolvedRequest {
        ResolvedRequest {
            keyword: "bangkok riverside hotel".to_string(),
            hotel: HotelRef::Id(12345),
            hotel_url: None,
            version: TemplateVersion::Long,
            status,
            category: 7,
            check_in: date!(2026 - 11 - 17),
            check_out: date!(2026 - 11 - 18),
            publish_at: match status {
                PublishStatus::Future => Some(datetime!(2026 - 10 - 19 9:00)),
                _ => None,
            },
            slug: Some("bangkok-riverside-hotel".to_string()),
            seo: SeoFields {
                title: Some("SEO title".to_string()),
                description: Some("SEO description".to_string()),
                focus_keyword: Some("riverside hotel".to_string()),
                canonical_url: None,
            },
        }
    }

    fn settings(base_url: String) -> PublisherSettings {
        PublisherSettings {
            base_url: Some(base_url),
            username: Some("editor".to_string()),
            app_password: Some(Secret::new("abcd efgh ijkl".to_string())),
            ..Default::default()
        }
    }

    async fn capture_server(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(None));
        let router = Router::new()
            .route(
                "/blog/wp-json/wp/v2/posts",
                post(
                    move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *captured.lock().unwrap() = Some((headers, body));
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());
        (serve(router).await, captured)
    }

    #[test]
    fn draft_maps_seo_fields_to_meta_and_excerpt() {
        let draft = draft_for(&resolved(PublishStatus::Draft), "T".into(), "<p>C</p>".into());

        assert_eq!(draft.categories, vec![7]);
        assert_eq!(draft.excerpt.as_deref(), Some("SEO description"));
        assert_eq!(draft.date, None);
        assert_eq!(draft.meta.get("rank_math_title").map(String::as_str), Some("SEO title"));
        assert_eq!(
            draft.meta.get("rank_math_focus_keyword").map(String::as_str),
            Some("riverside hotel")
        );
        assert!(!draft.meta.contains_key("rank_math_canonical_url"));
    }

    #[test]
    fn only_scheduled_drafts_carry_a_date() {
        let draft = draft_for(&resolved(PublishStatus::Future), "T".into(), "C".into());
        assert_eq!(draft.date.as_deref(), Some("2026-10-19T09:00:00"));

        let mut publish = resolved(PublishStatus::Publish);
        publish.publish_at = Some(datetime!(2026 - 10 - 19 9:00));
        assert_eq!(draft_for(&publish, "T".into(), "C".into()).date, None);
    }

    #[test]
    fn basic_token_encodes_credentials() {
        assert_eq!(basic_token("editor", "pass word"), "Basic ZWRpdG9yOnBhc3Mgd29yZA==");
    }

    #[test]
    fn endpoint_respects_base_path() {
        assert_eq!(
            posts_endpoint("https://blog.example.com").unwrap().as_str(),
            "https://blog.example.com/wp-json/wp/v2/posts"
        );
        assert_eq!(
            posts_endpoint("https://example.com/blog/").unwrap().as_str(),
            "https://example.com/blog/wp-json/wp/v2/posts"
        );
        assert!(posts_endpoint("not a url").is_none());
    }

    #[tokio::test]
    async fn creates_post_with_basic_auth() {
        let (base, captured) = capture_server(
            StatusCode::CREATED,
            json!({ "id": 321, "link": "https://blog.example.com/?p=321", "status": "future", "date": "2026-10-19T09:00:00", "guid": {} }),
        )
        .await;
        let client = WordPressClient::new(settings(format!("{base}/blog"))).unwrap();
        let draft = draft_for(&resolved(PublishStatus::Future), "Title".into(), "<p>x</p>".into());

        let result = client.create_post(&draft).await.unwrap();
        assert_eq!(result.id, 321);
        assert_eq!(result.status, "future");

        let (headers, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(
            headers["authorization"],
            basic_token("editor", "abcd efgh ijkl").as_str()
        );
        assert_eq!(body["status"], "future");
        assert_eq!(body["date"], "2026-10-19T09:00:00");
        assert_eq!(body["slug"], "bangkok-riverside-hotel");
        assert_eq!(body["meta"]["rank_math_description"], "SEO description");
    }

    #[tokio::test]
    async fn failure_status_maps_to_bad_gateway() {
        let (base, _) = capture_server(
            StatusCode::FORBIDDEN,
            json!({ "code": "rest_cannot_create", "message": "Sorry, you are not allowed to create posts." }),
        )
        .await;
        let client = WordPressClient::new(settings(format!("{base}/blog"))).unwrap();
        let draft = draft_for(&resolved(PublishStatus::Draft), "T".into(), "C".into());

        let err = client.create_post(&draft).await.unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 403, .. }));

        let app: AppError = err.into();
        assert_eq!(app.status(), StatusCode::BAD_GATEWAY);
        match app {
            AppError::Upstream { code, details, .. } => {
                assert_eq!(code, "upstream_publish_error");
                assert_eq!(details[0]["body"]["code"], "rest_cannot_create");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_settings_are_named() {
        let client = WordPressClient::new(PublisherSettings::default()).unwrap();
        let draft = draft_for(&resolved(PublishStatus::Draft), "T".into(), "C".into());

        match client.create_post(&draft).await {
            Err(PublishError::NotConfigured(missing)) => assert_eq!(
                missing,
                vec![
                    "HOTELPRESS_PUBLISHER__BASE_URL",
                    "HOTELPRESS_PUBLISHER__USERNAME",
                    "HOTELPRESS_PUBLISHER__APP_PASSWORD"
                ]
            ),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }
}

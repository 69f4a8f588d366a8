//! Hotel article publishing: validate a request, look the hotel up with the
//! affiliate API, build the article and create the post.

pub mod affiliate;
pub mod document;
pub mod lookup;
pub mod models;
pub mod publisher;
pub mod routes;
pub mod validator;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use hotelpress_authz::ApiKeyGuard;
use hotelpress_kernel::{InitCtx, Module, Settings};
use serde_json::json;

use affiliate::AffiliateClient;
use publisher::WordPressClient;
use routes::PublishingState;

pub struct PublishingModule {
    state: PublishingState,
    guard: ApiKeyGuard,
}

impl PublishingModule {
    pub fn new(state: PublishingState, guard: ApiKeyGuard) -> Self {
        Self { state, guard }
    }
}

#[async_trait]
impl Module for PublishingModule {
    fn name(&self) -> &'static str {
        "publishing"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let missing = ctx.settings.missing_publishing_settings();
        if missing.is_empty() {
            tracing::info!(
                module = self.name(),
                environment = ?ctx.settings.environment,
                "publishing module initialized"
            );
        } else {
            // Requests will answer 500 until these are set.
            tracing::warn!(
                module = self.name(),
                missing = ?missing,
                "publishing module initialized without full configuration"
            );
        }
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.guard.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/posts": {
                    "post": {
                        "summary": "Generate a hotel article and publish it",
                        "tags": ["Publishing"],
                        "description": format!(
                            "Requires the shared secret in the `{}` header.",
                            self.guard.header_name()
                        ),
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/PublishRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Post created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/PublishResponse" }
                                    }
                                }
                            },
                            "400": error_response("Invalid request"),
                            "401": error_response("Missing or wrong API key"),
                            "404": error_response("Hotel not found"),
                            "500": error_response("Missing configuration"),
                            "502": error_response("Affiliate or publish target failure")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Publishing health check",
                        "tags": ["Publishing"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "PublishRequest": {
                        "type": "object",
                        "properties": {
                            "keyword": { "type": "string" },
                            "hotelId": { "oneOf": [{ "type": "integer" }, { "type": "string" }] },
                            "hotelUrl": { "type": "string", "format": "uri" },
                            "cityId": { "oneOf": [{ "type": "integer" }, { "type": "string" }] },
                            "version": { "type": "string", "enum": ["short", "long", "random", "v1", "v2", "1", "2"] },
                            "publishType": { "type": "string" },
                            "status": { "type": "string", "description": "Alternative key for publishType" },
                            "category": { "type": "integer" },
                            "checkInDate": { "type": "string", "format": "date" },
                            "checkOutDate": { "type": "string", "format": "date" },
                            "slug": { "type": "string" },
                            "seoTitle": { "type": "string" },
                            "seoDescription": { "type": "string" },
                            "focusKeyword": { "type": "string" },
                            "canonicalUrl": { "type": "string", "format": "uri" },
                            "publishAt": { "type": "string" }
                        },
                        "required": ["keyword"]
                    },
                    "PublishResponse": {
                        "type": "object",
                        "properties": {
                            "success": { "type": "boolean" },
                            "resolved": { "type": "object" },
                            "post": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "integer" },
                                    "link": { "type": "string" },
                                    "status": { "type": "string" },
                                    "date": { "type": "string" }
                                },
                                "required": ["id", "status"]
                            }
                        },
                        "required": ["success", "resolved", "post"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "publishing module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "publishing module stopped");
        Ok(())
    }
}

/// Wire the publishing module to the real affiliate and WordPress clients.
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let hotels = AffiliateClient::new(settings.affiliate.clone())
        .context("failed to build affiliate HTTP client")?;
    let posts = WordPressClient::new(settings.publisher.clone())
        .context("failed to build publisher HTTP client")?;
    let guard = ApiKeyGuard::from_settings(&settings.auth)
        .with_context(|| format!("invalid auth header name '{}'", settings.auth.header_name))?;

    let state = PublishingState::new(
        Arc::new(settings.clone()),
        Arc::new(hotels),
        Arc::new(posts),
    );
    Ok(Arc::new(PublishingModule::new(state, guard)))
}

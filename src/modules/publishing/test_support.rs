//! In-memory collaborators and a throwaway HTTP server for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use url::Url;

use super::lookup::{HotelSource, LookupError, SearchCriteria};
use super::models::{HotelRecord, PostDraft, PublishResult};
use super::publisher::{PostSink, PublishError};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

enum SearchOutcome {
    Found(HotelRecord),
    Status(u16, String),
    Empty,
}

pub struct FakeHotels {
    outcome: SearchOutcome,
    page: Option<String>,
    searches: Mutex<Vec<SearchCriteria>>,
    pages: Mutex<Vec<Url>>,
}

impl FakeHotels {
    fn with_outcome(outcome: SearchOutcome) -> Self {
        Self {
            outcome,
            page: None,
            searches: Mutex::new(Vec::new()),
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn found(record: HotelRecord) -> Self {
        Self::with_outcome(SearchOutcome::Found(record))
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self::with_outcome(SearchOutcome::Status(status, body.to_string()))
    }

    pub fn empty() -> Self {
        Self::with_outcome(SearchOutcome::Empty)
    }

    pub fn with_page(mut self, html: &str) -> Self {
        self.page = Some(html.to_string());
        self
    }

    pub fn searches(&self) -> Vec<SearchCriteria> {
        self.searches.lock().unwrap().clone()
    }

    pub fn pages_fetched(&self) -> Vec<Url> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl HotelSource for FakeHotels {
    async fn search(&self, criteria: &SearchCriteria) -> Result<HotelRecord, LookupError> {
        self.searches.lock().unwrap().push(criteria.clone());
        match &self.outcome {
            SearchOutcome::Found(record) => Ok(record.clone()),
            SearchOutcome::Status(status, body) => Err(LookupError::Status {
                status: *status,
                body: body.clone(),
            }),
            SearchOutcome::Empty => Err(LookupError::NotFound(
                "affiliate API returned no hotels".to_string(),
            )),
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, LookupError> {
        self.pages.lock().unwrap().push(url.clone());
        self.page.clone().ok_or_else(|| LookupError::PageStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

pub struct FakePosts {
    failure: Option<(u16, String)>,
    drafts: Mutex<Vec<PostDraft>>,
}

impl FakePosts {
    pub fn accepting() -> Self {
        Self {
            failure: None,
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn drafts(&self) -> Vec<PostDraft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostSink for FakePosts {
    async fn create_post(&self, draft: &PostDraft) -> Result<PublishResult, PublishError> {
        self.drafts.lock().unwrap().push(draft.clone());
        if let Some((status, body)) = &self.failure {
            return Err(PublishError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(PublishResult {
            id: 321,
            link: Some("https://blog.example.com/?p=321".to_string()),
            status: draft.status.as_str().to_string(),
            date: draft.date.clone(),
        })
    }
}

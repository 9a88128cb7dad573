//! WordPress REST API client

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{ContentManagement, CreatedPost, MediaUpload, NewPost, UploadedMedia};
use crate::config::WordPressConfig;
use crate::errors::{AppError, Result};
use crate::llm::RetryPolicy;
use crate::metrics::RequestMetrics;
use crate::models::{NewTerm, TaxonomyKind, Term};

const SERVICE: &str = "wordpress";
const API_PATH: &str = "wp-json/wp/v2";
const PER_PAGE: u32 = 100;
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Request body variants
enum Payload<'a> {
    Empty,
    Json(serde_json::Value),
    File(&'a MediaUpload),
}

/// WordPress client authenticated with an application password
pub struct WordPressClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    application_password: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WordPressClient {
    /// Create a new WordPress client
    pub fn new(config: &WordPressConfig) -> Result<Self> {
        Self::with_timeout(config, config.timeout())
    }

    fn with_timeout(config: &WordPressConfig, timeout: Duration) -> Result<Self> {
        if config.username.is_empty() || config.application_password.is_empty() {
            return Err(AppError::Configuration {
                message: "wordpress.username and wordpress.application_password are required".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("PostForge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: format!("{}/{}", config.base_url.trim_end_matches('/'), API_PATH),
            username: config.username.clone(),
            application_password: config.application_password.clone(),
            timeout,
            retry: config.retry_policy(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn build(&self, method: &Method, endpoint: &str, query: &[(&str, String)], payload: &Payload<'_>) -> RequestBuilder {
        let request = self
            .client
            .request(method.clone(), self.url(endpoint))
            .basic_auth(&self.username, Some(&self.application_password))
            .query(query);

        match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(body),
            Payload::File(upload) => request
                .header(CONTENT_TYPE, upload.content_type.as_str())
                .header(
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", upload.filename.replace('"', "")),
                )
                .body(upload.data.clone()),
        }
    }

    /// Send with retries on timeouts and connection failures
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<Response> {
        // First path segment keeps metric labels bounded
        let label = endpoint.split('/').next().unwrap_or_default();
        let label = if label.is_empty() { "index" } else { label };

        let method = &method;
        let payload = &payload;

        self.retry
            .run(SERVICE, AppError::is_transport_failure, move || async move {
                let metrics = RequestMetrics::start(method.as_str(), label);
                let response = match self.build(method, endpoint, query, payload).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        metrics.finish(0);
                        return Err(AppError::from_transport(SERVICE, self.timeout.as_millis() as u64, e));
                    }
                };
                metrics.finish(response.status().as_u16());
                check_status(response, endpoint).await
            })
            .await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        payload: Payload<'_>,
    ) -> Result<T> {
        let response = self.execute(method, endpoint, query, payload).await?;
        parse_body(response, endpoint).await
    }
}

/// Map error statuses: 401 → `CmsAuth`, 404 → `NotFound`, others → `Upstream`
async fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(AppError::CmsAuth {
            message: "WordPress authentication failed".to_string(),
        }),
        StatusCode::NOT_FOUND => Err(AppError::NotFound {
            resource_type: "wordpress".to_string(),
            id: endpoint.to_string(),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), endpoint = %endpoint, body = %body, "WordPress API error");
            Err(AppError::upstream(SERVICE, status.as_u16(), body))
        }
    }
}

async fn parse_body<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
    response.json().await.map_err(|e| AppError::MalformedResponse {
        message: format!("Invalid WordPress response from '{}': {}", endpoint, e),
    })
}

fn total_pages(response: &Response) -> u32 {
    response
        .headers()
        .get(TOTAL_PAGES_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

#[async_trait]
impl ContentManagement for WordPressClient {
    async fn list_terms(&self, kind: TaxonomyKind) -> Result<Vec<Term>> {
        let endpoint = kind.collection();
        let mut terms = Vec::new();
        let mut page = 1;

        loop {
            let query = [("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
            let response = self.execute(Method::GET, endpoint, &query, Payload::Empty).await?;
            let pages = total_pages(&response);
            let batch: Vec<Term> = parse_body(response, endpoint).await?;
            terms.extend(batch);

            if page >= pages {
                break;
            }
            page += 1;
        }

        info!(kind = %kind, count = terms.len(), "Retrieved terms from WordPress");
        Ok(terms)
    }

    async fn create_term(&self, kind: TaxonomyKind, term: &NewTerm) -> Result<Term> {
        let mut body = json!({
            "name": term.name,
            "description": term.description,
        });
        if !term.slug.is_empty() {
            body["slug"] = json!(term.slug);
        }

        let created: Term = self
            .execute_json(Method::POST, kind.collection(), &[], Payload::Json(body))
            .await?;

        info!(kind = %kind, name = %created.name, id = created.id, "Created term in WordPress");
        Ok(created)
    }

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost> {
        let body = serde_json::to_value(post)?;
        let created: CreatedPost = self
            .execute_json(Method::POST, "posts", &[], Payload::Json(body))
            .await?;

        info!(
            post_id = created.id,
            status = %created.status,
            title = %post.title,
            "Created WordPress post"
        );
        Ok(created)
    }

    async fn upload_media(&self, upload: &MediaUpload) -> Result<UploadedMedia> {
        let response = self
            .execute(Method::POST, "media", &[], Payload::File(upload))
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(SERVICE, status.as_u16(), body));
        }
        let media: UploadedMedia = parse_body(response, "media").await?;

        if upload.title.is_some() || upload.alt_text.is_some() {
            let mut body = serde_json::Map::new();
            if let Some(title) = &upload.title {
                body.insert("title".to_string(), json!(title));
            }
            if let Some(alt_text) = &upload.alt_text {
                body.insert("alt_text".to_string(), json!(alt_text));
            }
            let endpoint = format!("media/{}", media.id);
            self.execute(Method::POST, &endpoint, &[], Payload::Json(body.into()))
                .await?;
            debug!(media_id = media.id, "Updated media metadata");
        }

        info!(media_id = media.id, filename = %upload.filename, "Uploaded media");
        Ok(media)
    }

    async fn test_connection(&self) -> Result<()> {
        self.execute(Method::GET, "", &[], Payload::Empty).await?;
        info!(base_url = %self.base_url, "WordPress API connection test successful");
        Ok(())
    }
}

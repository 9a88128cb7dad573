//! Article job processor
//!
//! Drives one generation request through the pipeline and, when asked,
//! publishes the result, keeping an [`ArticleJob`] in step with each stage.

use postforge_common::{
    cms::MediaUpload,
    models::{ArticleJob, GenerationInput},
    publish::{PublishOutcome, PublishRequest, Publisher},
    AppError, ArticlePipeline, GeneratedArticle,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Everything a run produced, written as the `--output` document
#[derive(Debug, Serialize)]
pub struct ArticleRun {
    pub job: ArticleJob,
    pub generated: GeneratedArticle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishOutcome>,
}

/// A run that stopped early, carrying the job in its failed state
#[derive(Debug)]
pub struct FailedRun {
    pub job: ArticleJob,
    pub error: AppError,
}

impl std::fmt::Display for FailedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job {} failed: {}", self.job.id, self.error)
    }
}

impl std::error::Error for FailedRun {}

/// Generation and publishing processor
pub struct ArticleProcessor {
    pipeline: ArticlePipeline,
    publisher: Option<Arc<Publisher>>,
}

impl ArticleProcessor {
    pub fn new(pipeline: ArticlePipeline) -> Self {
        Self { pipeline, publisher: None }
    }

    /// Enable publishing; without a publisher only generation runs
    pub fn with_publisher(mut self, publisher: Arc<Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Generate an article and optionally publish it.
    ///
    /// `featured` is uploaded only when publishing and becomes the post's
    /// featured media.
    #[instrument(skip(self, input, publish, featured), fields(target_chars = input.target_chars))]
    pub async fn process(
        &self,
        input: &GenerationInput,
        publish: Option<&PublishRequest>,
        featured: Option<&MediaUpload>,
    ) -> Result<ArticleRun, FailedRun> {
        let mut job = ArticleJob::new(input.idempotency_key());
        info!(job_id = %job.id, key = %job.idempotency_key, "Processing article job");

        // Reject a bad publish request before spending any generation calls
        let publish = match publish {
            Some(request) => match (&self.publisher, request.validate_at(chrono::Utc::now())) {
                (_, Err(e)) => return Err(fail(job, e)),
                (None, Ok(())) => {
                    let e = AppError::Configuration {
                        message: "publishing requested but no publisher is configured".to_string(),
                    };
                    return Err(fail(job, e));
                }
                (Some(publisher), Ok(())) => Some((publisher, request)),
            },
            None => None,
        };

        job.mark_generating();
        let generated = match self.pipeline.generate(input).await {
            Ok(generated) => generated,
            Err(e) => return Err(fail(job, e)),
        };
        job.mark_generated(&generated.article.slug, generated.verdict.char_count);
        info!(
            job_id = %job.id,
            slug = %generated.article.slug,
            char_count = generated.verdict.char_count,
            verdict = generated.verdict.status.as_str(),
            "Article generated"
        );

        let Some((publisher, request)) = publish else {
            record_job(&job);
            return Ok(ArticleRun { job, generated, published: None });
        };

        job.mark_publishing();
        let featured_media = match featured {
            Some(upload) => match publisher.upload_media(upload).await {
                Ok(media) => {
                    info!(
                        job_id = %job.id,
                        media_id = media.id,
                        url = %media.source_url,
                        "Uploaded featured image"
                    );
                    Some(media.id)
                }
                Err(e) => return Err(fail(job, e)),
            },
            None => None,
        };

        match publisher.publish(&generated.article, request, featured_media).await {
            Ok(outcome) => {
                job.mark_published(outcome.post_id, &outcome.post_url);
                record_job(&job);
                Ok(ArticleRun { job, generated, published: Some(outcome) })
            }
            Err(e) => Err(fail(job, e)),
        }
    }
}

fn fail(mut job: ArticleJob, error: AppError) -> FailedRun {
    error!(job_id = %job.id, error = %error, status = ?job.status, "Article job failed");
    job.mark_failed(&error.to_string());
    record_job(&job);
    FailedRun { job, error }
}

fn record_job(job: &ArticleJob) {
    let status: String = job.status.into();
    metrics::counter!("postforge_article_jobs_total", "status" => status).increment(1);
}

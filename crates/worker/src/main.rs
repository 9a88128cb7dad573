//! PostForge Worker
//!
//! Command-line entry point for the article pipeline:
//! 1. `generate` - run the pipeline for one input file, optionally publishing
//! 2. `sync-taxonomies` - pull WordPress categories and tags into the cache
//! 3. `taxonomies` - print the cached terms of one kind
//! 4. `check-connection` - verify WordPress credentials

mod processor;

use crate::processor::ArticleProcessor;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use postforge_common::{
    cache::{create_taxonomy_store, TaxonomyStore},
    cms::{ContentManagement, MediaUpload, WordPressClient},
    config::{AppConfig, ObservabilityConfig},
    llm::create_language_model,
    metrics::register_metrics,
    models::{GenerationInput, TaxonomyKind},
    publish::{PublishMode, PublishRequest, Publisher},
    taxonomy::TaxonomyResolver,
    ArticlePipeline, LanguageModel, VERSION,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "postforge")]
#[command(version)]
#[command(about = "Generate Japanese long-form articles and publish them to WordPress")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: config/ layers and APP__ variables)
    #[arg(long, short, global = true, env = "POSTFORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one article from a JSON input file
    Generate {
        /// GenerationInput JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Write the run report (job, article, verdict) as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Publish the result after generation
        #[arg(long, value_enum)]
        publish: Option<PublishArg>,

        /// Go-live time for `--publish schedule` (RFC 3339)
        #[arg(long, requires = "publish")]
        schedule_at: Option<DateTime<Utc>>,

        /// Image uploaded as the post's featured media
        #[arg(long, requires = "publish")]
        featured_image: Option<PathBuf>,
    },

    /// Pull every WordPress category and tag into the taxonomy cache
    SyncTaxonomies,

    /// Print cached terms of one kind
    Taxonomies {
        #[arg(value_enum)]
        kind: KindArg,
    },

    /// Verify the WordPress endpoint and credentials
    CheckConnection,
}

#[derive(Clone, Copy, ValueEnum)]
enum PublishArg {
    Draft,
    Publish,
    Schedule,
}

impl From<PublishArg> for PublishMode {
    fn from(arg: PublishArg) -> Self {
        match arg {
            PublishArg::Draft => PublishMode::Draft,
            PublishArg::Publish => PublishMode::Publish,
            PublishArg::Schedule => PublishMode::Schedule,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Category,
    Tag,
}

impl From<KindArg> for TaxonomyKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Category => TaxonomyKind::Category,
            KindArg::Tag => TaxonomyKind::Tag,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!("Starting PostForge Worker v{}", VERSION);

    if config.observability.metrics_port != 0 {
        init_metrics(config.observability.metrics_port)?;
    }

    let result = match cli.command {
        Command::Generate {
            input,
            output,
            publish,
            schedule_at,
            featured_image,
        } => {
            let request = publish.map(|mode| PublishRequest {
                mode: mode.into(),
                schedule_at,
            });
            generate(&config, &input, output.as_deref(), request, featured_image.as_deref()).await
        }
        Command::SyncTaxonomies => sync_taxonomies(&config).await,
        Command::Taxonomies { kind } => list_taxonomies(&config, kind.into()).await,
        Command::CheckConnection => check_connection(&config).await,
    };

    if let Err(e) = &result {
        error!(error = %format!("{:#}", e), "Command failed");
    }
    result
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    register_metrics();
    info!(%addr, "Metrics exporter listening");
    Ok(())
}

fn wordpress(config: &AppConfig) -> anyhow::Result<Arc<dyn ContentManagement>> {
    let client = WordPressClient::new(&config.wordpress)?;
    info!(base_url = %client.base_url(), "WordPress client initialized");
    Ok(Arc::new(client))
}

async fn resolver(
    config: &AppConfig,
    cms: Arc<dyn ContentManagement>,
) -> anyhow::Result<Arc<TaxonomyResolver>> {
    let store: Arc<dyn TaxonomyStore> =
        create_taxonomy_store(&config.taxonomy, &config.redis).await?;
    info!(store = %config.taxonomy.store, "Taxonomy store initialized");
    Ok(Arc::new(TaxonomyResolver::new(store, cms, &config.taxonomy)))
}

async fn generate(
    config: &AppConfig,
    input_path: &Path,
    output_path: Option<&Path>,
    request: Option<PublishRequest>,
    featured_image: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(input_path)
        .await
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let input: GenerationInput = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid generation input in {}", input_path.display()))?;

    let featured = match featured_image {
        Some(path) => Some(read_media(path).await?),
        None => None,
    };

    let llm = create_language_model(&config.generation)?;
    info!(model = %llm.model_name(), "Language model initialized");
    let pipeline = ArticlePipeline::new(llm, &config.pipeline);

    let mut processor = ArticleProcessor::new(pipeline);
    if request.is_some() {
        let cms = wordpress(config)?;
        let publisher = Publisher::new(cms.clone(), resolver(config, cms).await?);
        processor = processor.with_publisher(Arc::new(publisher));
    }

    let run = processor
        .process(&input, request.as_ref(), featured.as_ref())
        .await?;

    let report = serde_json::to_string_pretty(&run)?;
    match output_path {
        Some(path) => {
            tokio::fs::write(path, report)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote run report");
        }
        None => println!("{}", report),
    }

    if let Some(published) = &run.published {
        println!("Published post {} ({})", published.post_id, published.post_url);
    }
    Ok(())
}

async fn read_media(path: &Path) -> anyhow::Result<MediaUpload> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => anyhow::bail!("Unsupported image type: {}", path.display()),
    };

    Ok(MediaUpload {
        filename,
        content_type: content_type.to_string(),
        data,
        title: None,
        alt_text: None,
    })
}

async fn sync_taxonomies(config: &AppConfig) -> anyhow::Result<()> {
    let cms = wordpress(config)?;
    let resolver = resolver(config, cms).await?;

    let (categories, tags) = resolver.sync_from_cms().await?;
    println!("Synced {} categories and {} tags", categories, tags);
    Ok(())
}

async fn list_taxonomies(config: &AppConfig, kind: TaxonomyKind) -> anyhow::Result<()> {
    let store = create_taxonomy_store(&config.taxonomy, &config.redis).await?;
    let entries = store.list(kind).await?;

    for entry in &entries {
        let id = entry
            .external_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>8}  {}  ({})", id, entry.name, entry.slug);
    }
    info!(kind = %kind, count = entries.len(), "Listed cached terms");
    Ok(())
}

async fn check_connection(config: &AppConfig) -> anyhow::Result<()> {
    let cms = wordpress(config)?;
    cms.test_connection().await?;
    println!("WordPress connection OK");
    Ok(())
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use filmsync::embedder::ollama::{self, OllamaEmbedder};
use filmsync::embedder::openai::OpenAiEmbedder;
use filmsync::embedder::DEFAULT_DIMENSIONS;
use filmsync::{
    telemetry, EmbeddingProvider, EmbeddingSync, Pipeline, PipelineArgs, PipelineControls,
    StoreArgs,
};
use tracing::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Local inference host exposing `POST /api/embed`
    Ollama,
    /// OpenAI-compatible `POST /embeddings`
    Openai,
}

#[derive(Parser, Debug)]
#[command(
    name = "filmsync-embed",
    about = "Compute retrieval embeddings for localized movies that have none"
)]
struct EmbedCli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Embedding service flavor
    #[arg(long, value_enum, env = "FILMSYNC_EMBED_BACKEND", default_value = "ollama")]
    backend: Backend,

    /// Base URL of the Ollama host
    #[arg(long, env = "OLLAMA_BASE_URL", default_value = "http://localhost:11434")]
    ollama_base_url: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// API key for the OpenAI backend
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Model to request; defaults to bge-m3 for Ollama
    #[arg(long, env = "FILMSYNC_EMBED_MODEL")]
    model: Option<String>,

    /// Expected vector length; 0 disables the check
    #[arg(long, env = "FILMSYNC_EMBED_DIMENSIONS", default_value_t = DEFAULT_DIMENSIONS)]
    dimensions: usize,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl EmbedCli {
    fn provider(&self, controls: &PipelineControls) -> Result<Arc<dyn EmbeddingProvider>> {
        let dimensions = (self.dimensions > 0).then_some(self.dimensions);
        let provider: Arc<dyn EmbeddingProvider> = match self.backend {
            Backend::Ollama => Arc::new(OllamaEmbedder::new(
                self.ollama_base_url.clone(),
                self.model
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_MODEL.to_string()),
                dimensions,
                controls.request_timeout(),
            )?),
            Backend::Openai => {
                let api_key = self
                    .openai_api_key
                    .clone()
                    .context("OPENAI_API_KEY is required for the openai backend")?;
                let model = self
                    .model
                    .clone()
                    .context("--model is required for the openai backend")?;
                Arc::new(OpenAiEmbedder::new(
                    api_key,
                    self.openai_base_url.clone(),
                    model,
                    dimensions,
                    controls.request_timeout(),
                )?)
            }
        };
        Ok(provider)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = EmbedCli::parse();
    telemetry::init(cli.verbose);

    let controls = cli.pipeline.build_controls(PipelineControls::embedding());
    let provider = cli.provider(&controls)?;
    info!(backend = ?cli.backend, model = provider.model(), "embedding backend ready");
    let store = cli
        .store
        .connect(&controls)
        .await
        .context("failed to open the movies store")?;

    let summary = Pipeline::new(EmbeddingSync::new(provider), Arc::new(store), controls)
        .run()
        .await?;
    info!(%summary, "embedding sync finished");
    println!("{summary}");
    Ok(())
}

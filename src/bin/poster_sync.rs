use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use filmsync::{
    telemetry, Pipeline, PipelineArgs, PipelineControls, PosterSync, StoreArgs, TmdbArgs,
    TmdbClient,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "filmsync-poster",
    about = "Refresh poster paths for every movie with a TMDB id"
)]
struct PosterCli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    tmdb: TmdbArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PosterCli::parse();
    telemetry::init(cli.verbose);

    let controls = cli.pipeline.build_controls(PipelineControls::poster());
    let store = cli
        .store
        .connect(&controls)
        .await
        .context("failed to open the movies store")?;
    // Poster paths are language independent; `--language` is ignored here.
    let client = TmdbClient::new(
        cli.tmdb.tmdb_api_key,
        cli.tmdb.tmdb_base_url,
        controls.request_timeout(),
    )?;

    let summary = Pipeline::new(PosterSync::new(client), Arc::new(store), controls)
        .run()
        .await?;
    info!(%summary, "poster sync finished");
    println!("{summary}");
    Ok(())
}

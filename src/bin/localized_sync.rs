use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use filmsync::{
    telemetry, LocalizedSync, Pipeline, PipelineArgs, PipelineControls, StoreArgs, TmdbArgs,
    TmdbClient,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "filmsync-localized",
    about = "Fill localized title, overview, and tagline for movies that have none yet"
)]
struct LocalizedCli {
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
    let cli = LocalizedCli::parse();
    telemetry::init(cli.verbose);

    let controls = cli.pipeline.build_controls(PipelineControls::localized());
    let store = cli
        .store
        .connect(&controls)
        .await
        .context("failed to open the movies store")?;
    let client = TmdbClient::new(
        cli.tmdb.tmdb_api_key,
        cli.tmdb.tmdb_base_url,
        controls.request_timeout(),
    )?;

    let summary = Pipeline::new(
        LocalizedSync::new(client, cli.tmdb.language),
        Arc::new(store),
        controls,
    )
    .run()
    .await?;
    info!(%summary, "localized sync finished");
    println!("{summary}");
    Ok(())
}

//! Log subscriber setup shared by the pipeline binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks `debug` over `info`
/// for this crate.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "filmsync=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests, embedding callers) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init(false);
        init(true);
        tracing::info!("subscriber installed");
    }
}

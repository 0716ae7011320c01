use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber, logging to stderr so that stdout
/// only carries the tools' output.
///
/// `RUST_LOG` is honored; `verbose` adds `pcdtools=debug` on top of it.
pub fn enable_tracing(verbose: bool) {
    let mut filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if verbose {
        if let Ok(directive) = "pcdtools=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}

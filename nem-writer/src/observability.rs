use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "nem_writer=info";

/// Filter taken from `RUST_LOG`, or `nem_writer=info` when it is unset or invalid.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn init_tracing() {
    // Ignore the error if the embedding application already installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .try_init();
}

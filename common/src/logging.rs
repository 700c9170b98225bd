use tracing_subscriber::EnvFilter;

/// Installs the process-wide `tracing` subscriber.
///
/// `default_level` is used when `RUST_LOG` is unset — lets callers drive the
/// filter from their own config (e.g. `logging.log_level`) without forcing
/// every caller through an env var. Output is line-oriented JSON when
/// `LOG_FORMAT=json`, human-readable otherwise; JSON is what we run with
/// in-cluster so log shippers don't have to parse free text.
pub fn init_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

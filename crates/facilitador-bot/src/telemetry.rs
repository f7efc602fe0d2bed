use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparseable
pub const DEFAULT_FILTER: &str = "info,facilitador_bot=info,tower_http=info,hora=warn";

fn env_filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Returns false if one was already set,
/// which happens when tests initialise logging more than once.
pub fn init_tracing() -> bool {
    let installed = fmt()
        .with_env_filter(env_filter_or(DEFAULT_FILTER))
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialised");
    }
    installed
}

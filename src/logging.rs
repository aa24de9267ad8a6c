use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const NOISY_CRATES: &str = "h2=info,hyper=info,hyper_util=info,reqwest=info,alloy_transport_http=info";

/// Filter directives for `level`. A bare level gets the noisy HTTP crates
/// pinned to `info`; anything with `,` or `=` is used as given.
pub fn filter_spec(level: &str) -> String {
    let level = level.trim();
    if level.contains(',') || level.contains('=') {
        level.to_string()
    } else {
        format!("{level},{NOISY_CRATES}")
    }
}

/// Install the global subscriber. Logs go to stderr; stdout is left to the
/// console renderer.
///
/// With no level, `RUST_LOG` is used, falling back to `info`.
pub fn init(level: Option<&str>, json: bool) {
    let filter = match level {
        Some(level) => {
            EnvFilter::from_str(&filter_spec(level)).unwrap_or_else(|_| EnvFilter::new("info"))
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_spec("info"))),
    };
    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(json, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_spec() {
        assert!(filter_spec("debug").starts_with("debug,h2=info"));
        assert_eq!(filter_spec("rebalance_flow=trace"), "rebalance_flow=trace");
        assert!(EnvFilter::from_str(&filter_spec("warn")).is_ok());
    }
}

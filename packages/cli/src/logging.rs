use tracing_subscriber::EnvFilter;

/// Environment variable holding a full `tracing` filter directive.
pub const LOG_ENV: &str = "SWAPKIT_LOG";

/// Default filter for a `-v` count. Without `-v` the SDK logs at info so
/// per-attempt progress shows; `-v` info, `-vv` debug, `-vvv` trace for both
/// swapkit crates. Dependencies stay at warn.
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "warn,swapkit_sdk=info".to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,swapkit_sdk={level},swapkit={level}")
}

/// Install the global subscriber. Logs go to stderr so `--json` stdout stays
/// machine-readable. `SWAPKIT_LOG` overrides the `-v` flags when set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // Ignore the error: a subscriber may already be installed in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_only_our_crates() {
        assert_eq!(default_directive(0), "warn,swapkit_sdk=info");
        assert_eq!(default_directive(1), "warn,swapkit_sdk=info,swapkit=info");
        assert_eq!(default_directive(9), "warn,swapkit_sdk=trace,swapkit=trace");
    }

    #[test]
    fn attempt_progress_is_on_by_default() {
        let filter = default_directive(0);
        assert!(filter.split(',').any(|d| d == "swapkit_sdk=info"));
    }

    #[test]
    fn directives_parse() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }
}

//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing-subscriber`; stdout carries only
//! the lines the suite is judged by (failure lines, the size error and the
//! final verdict). `RUST_LOG` overrides the default filter.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "mpitrace=info,trace_test=info";

/// Output format for diagnostics.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored output for reading one rank at a time.
    Pretty,
    /// One line per event, suited to interleaved output from many ranks.
    #[default]
    Compact,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Calling this again after a subscriber is installed is not an error.
pub fn init(format: LogFormat) -> Result<(), String> {
    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_filter(env_filter())
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .with_filter(env_filter())
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {e}"))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_compact() {
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }

    #[test]
    fn format_names_parse() {
        assert_eq!(LogFormat::from_str("pretty", false), Ok(LogFormat::Pretty));
        assert_eq!(LogFormat::from_str("compact", false), Ok(LogFormat::Compact));
        assert!(LogFormat::from_str("json", false).is_err());
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_twice_is_harmless() {
        assert!(init(LogFormat::Compact).is_ok());
        assert!(init(LogFormat::Pretty).is_ok());
    }
}

//! Maps the CLI's own notion of verbosity onto a `tracing-subscriber`
//! filter. Grounded on `ruff::logging::LogLevel`'s four-level enum, with
//! `fern`/`log` swapped for `tracing`/`tracing-subscriber` to match the rest
//! of this workspace (`knotty_semantic::analyzer` emits `tracing` spans, not
//! `log` records).

use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialOrd, Ord, PartialEq, Eq, Copy, Clone)]
pub enum LogLevel {
    /// No output at all.
    Silent,
    /// Only diagnostics, no decorative or progress output.
    Quiet,
    #[default]
    Default,
    /// Verbose tracing of the analysis itself.
    Verbose,
}

impl LogLevel {
    fn filter_directive(self) -> &'static str {
        match self {
            Self::Silent | Self::Quiet => "off",
            Self::Default => "info",
            Self::Verbose => "debug",
        }
    }
}

pub fn set_up_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::LogLevel;

    #[test]
    fn ordering() {
        assert!(LogLevel::Default > LogLevel::Silent);
        assert!(LogLevel::Default >= LogLevel::Default);
        assert!(LogLevel::Quiet > LogLevel::Silent);
        assert!(LogLevel::Verbose > LogLevel::Default);
        assert!(LogLevel::Verbose > LogLevel::Silent);
    }
}

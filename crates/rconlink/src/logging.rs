//! Diagnostic output for the `rconlink` binary.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Filter directives in this variable override `--log-level`, e.g.
/// `RCONLINK_LOG=rconlink_skills=trace,info`.
pub const LOG_ENV: &str = "RCONLINK_LOG";

/// Shape of each log record on stderr.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per record, for log shippers.
    Json,
}

/// Lowest severity written to stderr.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only failures: lost connections, rejected auth.
    Error,
    /// Also failed requests and skill routines that gave up.
    Warn,
    /// Also connects, skill starts and skill completions.
    Info,
    /// Also each dispatched tool call and cancelled skill.
    Debug,
    /// Everything, including individual frames.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Builds the filter for `level` unless `RCONLINK_LOG` supplies one.
fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.as_filter().into()))
}

/// Install the global subscriber. Records go to stderr because stdout
/// carries command output and the `serve` request stream. A second call is
/// a no-op.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level))
        .with_ansi(false)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_matching_filters() {
        assert_eq!(LogLevel::Error.as_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Info.as_filter(), LevelFilter::INFO);
        assert_eq!(LogLevel::Trace.as_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn level_names_parse_from_the_command_line() {
        let level = LogLevel::from_str("debug", true).expect("debug is a level");
        assert_eq!(level.as_filter(), LevelFilter::DEBUG);
        assert!(LogLevel::from_str("verbose", true).is_err());
    }
}

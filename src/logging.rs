//! Logging setup and the structured failure sink.
//!
//! Logs go to stderr so stdout stays free for command output. The level comes
//! from `RUST_LOG` when it is set, otherwise from [`LoggingConfig`].

use serde::Deserialize;
use std::error::Error;
use std::str::FromStr;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{debug_payload, recovery_info, Category};

/// Log level configuration for the logging middleware.
///
/// Deserializes through [`FromStr`], so configuration accepts the same
/// case-insensitive names and the `warning` alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level - least verbose
    Error,
    /// Disable logging entirely
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
            LogLevel::Off => Level::ERROR, // Will be filtered out by directive
        }
    }
}

impl From<u8> for LogLevel {
    /// Convert verbosity count to log level.
    /// 0 = Info, 1 = Debug, 2+ = Trace
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Returned when a log level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ParseLogLevelError;

    fn try_from(s: String) -> Result<Self, <LogLevel as TryFrom<String>>::Error> {
        s.parse()
    }
}

/// Configuration for the logging middleware.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include the target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamps: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Create a configuration from verbosity level (0 = info, 1 = debug, 2+ = trace).
    pub fn from_verbosity(verbosity: u8) -> Self {
        Self::default().with_level(LogLevel::from(verbosity))
    }
}

/// Initialize the global subscriber with the given configuration.
///
/// Call once at the start of the process; a second call panics inside
/// `tracing-subscriber`.
///
/// # Examples
///
/// ```no_run
/// use errchain::logging::{init_logging, LoggingConfig, LogLevel};
///
/// init_logging(
///     LoggingConfig::new()
///         .with_level(LogLevel::Debug)
///         .with_timestamps(false)
/// );
/// ```
pub fn init_logging(config: LoggingConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.level.as_str())
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    if config.with_timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

/// The level a failure of `category` is logged at.
///
/// Cancellations are expected, transient provider trouble is a warning and
/// everything else needs someone to act.
pub fn failure_level(category: Category) -> Level {
    match category {
        Category::Cancelled => Level::INFO,
        Category::RateLimit | Category::Network | Category::Server => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Emits one structured event describing `err`.
pub fn log_failure(err: &(dyn Error + 'static)) {
    let info = recovery_info(err);
    let payload = debug_payload(err);
    let category = info.category.as_str();
    let correlation_id = info.correlation_id.as_deref().unwrap_or("-");

    let level = failure_level(info.category);
    if level == Level::INFO {
        info!(
            category,
            correlation_id,
            retry_possible = info.retry_possible,
            %payload,
            "Operation failed"
        );
    } else if level == Level::WARN {
        warn!(
            category,
            correlation_id,
            retry_possible = info.retry_possible,
            %payload,
            "Operation failed"
        );
    } else {
        error!(
            category,
            correlation_id,
            retry_possible = info.retry_possible,
            %payload,
            "Operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifiedError;

    #[test]
    fn test_log_level_from_verbosity() {
        assert!(matches!(LogLevel::from(0), LogLevel::Info));
        assert!(matches!(LogLevel::from(1), LogLevel::Debug));
        assert!(matches!(LogLevel::from(2), LogLevel::Trace));
        assert!(matches!(LogLevel::from(10), LogLevel::Trace));
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(
            "loud".parse::<LogLevel>(),
            Err(ParseLogLevelError("loud".to_string()))
        );
    }

    #[test]
    fn test_log_level_deserializes_like_from_str() {
        #[derive(Debug, Deserialize)]
        struct Section {
            level: LogLevel,
        }

        let section: Section = toml::from_str("level = \"warning\"").unwrap();
        assert_eq!(section.level, LogLevel::Warn);
        let section: Section = toml::from_str("level = \" Trace \"").unwrap();
        assert_eq!(section.level, LogLevel::Trace);

        let err = toml::from_str::<Section>("level = \"loud\"").unwrap_err();
        assert!(err.to_string().contains("unknown log level: loud"));
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_timestamps(false)
            .with_target(false);

        assert!(matches!(config.level, LogLevel::Debug));
        assert!(!config.with_timestamps);
        assert!(!config.with_target);
    }

    #[test]
    fn test_logging_config_from_verbosity() {
        let config = LoggingConfig::from_verbosity(2);
        assert!(matches!(config.level, LogLevel::Trace));
        assert!(config.with_timestamps);
    }

    #[test]
    fn test_failure_level() {
        assert_eq!(failure_level(Category::Cancelled), Level::INFO);
        assert_eq!(failure_level(Category::RateLimit), Level::WARN);
        assert_eq!(failure_level(Category::Network), Level::WARN);
        assert_eq!(failure_level(Category::Server), Level::WARN);
        assert_eq!(failure_level(Category::Auth), Level::ERROR);
        assert_eq!(failure_level(Category::Unknown), Level::ERROR);
    }

    #[test]
    fn test_log_failure_without_subscriber() {
        let err = ClassifiedError::new("openai", "boom", Category::Server);
        log_failure(&err);
    }
}

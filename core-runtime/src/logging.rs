//! # Logging & Tracing Infrastructure
//!
//! The decoder crates only emit `tracing` events and spans (`open`, `seek`).
//! This module installs the subscriber that renders them:
//! - pretty, compact or JSON output on stderr
//! - a default filter that keeps the codec library quiet
//! - optional mirroring into a host [`LoggerSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::logging::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! ```
//!
//! Setting `XMP_FLAC_LOG` (same syntax as `RUST_LOG`) overrides the filter
//! when the config is built with [`LoggingConfig::from_env`].

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::error::{Error, Result};

/// Environment variable holding a filter directive string.
pub const FILTER_ENV: &str = "XMP_FLAC_LOG";

/// Crates whose events follow the configured level.
const DECODER_TARGETS: &[&str] = &["bridge_desktop", "core_runtime", "core_decoder"];

/// Codec library events below this level are dropped by the default filter.
const CODEC_LIBRARY_FILTER: &str = "symphonia=warn";

/// Output rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One JSON object per event
    Json,
    /// One line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Subscriber settings for [`init_logging`].
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Full directive string replacing the default filter,
    /// e.g. `core_decoder::seek=trace,symphonia=warn`.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close, so each seek shows up as a unit.
    pub enable_spans: bool,
    pub display_target: bool,
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("has_logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .field("display_target", &self.display_target)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Defaults, with the filter taken from [`FILTER_ENV`] when set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(FILTER_ENV) {
            Ok(filter) if !filter.trim().is_empty() => config.with_filter(filter),
            _ => config,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    /// Directive string the subscriber will be filtered with.
    pub fn filter_directives(&self) -> String {
        if let Some(filter) = &self.filter {
            return filter.clone();
        }
        let level = self.level.as_str().to_ascii_lowercase();
        let mut directives = vec![level.clone()];
        directives.extend(DECODER_TARGETS.iter().map(|t| format!("{}={}", t, level)));
        directives.push(CODEC_LIBRARY_FILTER.to_string());
        directives.join(",")
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Config`] when the filter does not parse or a global subscriber
/// is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(build_fmt_layer(&config))
        .with(HostSinkLayer {
            sink: config.logger_sink.clone(),
        })
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = config.filter_directives();
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter {:?}: {}", directives, e)))
}

fn build_fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let spans = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(config.display_target)
        .with_span_events(spans);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(false)
            .boxed(),
    }
}

/// Mirrors events into the host's [`LoggerSink`].
struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut entry = LogEntry::new(
            level,
            metadata.target(),
            fields.message.unwrap_or_else(|| metadata.name().to_string()),
        );
        entry.fields = fields.values;
        if let Some(span) = ctx.event_span(event) {
            entry = entry.with_span(span.name());
        }

        if let Err(err) = sink.log(entry) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: BTreeMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    // Integers and bools render the same through Debug
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

fn log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// File name of a path, for logging which file a session opened.
///
/// ```ignore
/// tracing::info!(file = %strip_path("/home/me/Music/track.flac"), "Opening");
/// // file=track.flac
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
        min_level: LogLevel,
    }

    impl RecordingSink {
        fn at(min_level: LogLevel) -> Arc<Self> {
            Arc::new(Self {
                entries: Mutex::new(Vec::new()),
                min_level,
            })
        }
    }

    impl LoggerSink for RecordingSink {
        fn log(&self, entry: LogEntry) -> bridge_traits::error::Result<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            self.min_level
        }
    }

    fn with_sink(sink: Arc<RecordingSink>, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(HostSinkLayer {
            sink: Some(sink as Arc<dyn LoggerSink>),
        });
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_default_directives() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        assert_eq!(
            config.filter_directives(),
            "debug,bridge_desktop=debug,core_runtime=debug,core_decoder=debug,symphonia=warn"
        );
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Error)
            .with_filter("core_decoder::seek=trace");
        assert_eq!(config.filter_directives(), "core_decoder::seek=trace");
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LoggingConfig::default().with_filter("core_decoder=loudest");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_format_tracks_build_profile() {
        let expected = if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Compact
        };
        assert_eq!(LogFormat::default(), expected);
    }

    #[test]
    fn test_debug_hides_sink() {
        let config = LoggingConfig::default().with_logger_sink(RecordingSink::at(LogLevel::Info));
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("has_logger_sink: true"));
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/home/user/music/song.flac"), "song.flac");
        assert_eq!(strip_path("C:\\Music\\song.flac"), "song.flac");
        assert_eq!(strip_path("song.flac"), "song.flac");
        assert_eq!(strip_path("/var/log/"), "");
    }

    #[test]
    fn test_sink_receives_message_fields_and_span() {
        let sink = RecordingSink::at(LogLevel::Debug);
        with_sink(sink.clone(), || {
            let span = tracing::info_span!("seek");
            let _enter = span.enter();
            tracing::info!(
                target: "core_decoder::seek",
                target_secs = 5.0,
                attempts = 2u32,
                "Seek degraded"
            );
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_decoder::seek");
        assert_eq!(entry.message, "Seek degraded");
        assert_eq!(entry.field("target_secs"), Some("5"));
        assert_eq!(entry.field("attempts"), Some("2"));
        assert_eq!(entry.span.as_deref(), Some("seek"));
    }

    #[test]
    fn test_sink_min_level() {
        let sink = RecordingSink::at(LogLevel::Warn);
        with_sink(sink.clone(), || {
            tracing::debug!("Absolute seek attempt");
            tracing::warn!("Frame decode failed, flushing");
        });

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
    }
}

//! Tracing setup for plugins.
//!
//! Events are formatted by `tracing-subscriber` and written either to the
//! simulator's log through [`DataAccess::debug_string`] or to stderr.
//! `RUST_LOG` overrides the configured level.
//!
//! # Example
//! ```no_run
//! use datarefw::config::DatarefwConfig;
//! use datarefw::host::XplmHost;
//! use datarefw::logging;
//!
//! let config = DatarefwConfig::load()?;
//! logging::init(&config.logging, XplmHost)?;
//! tracing::info!("plugin started");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use crate::error::{DatarefError, Result};
use crate::host::DataAccess;

/// A boxed layer ready to be added to a subscriber.
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// `MakeWriter` that sends each formatted event to the host log.
#[derive(Debug, Clone)]
pub struct HostLogWriter<H> {
    host: H,
}

impl<H: DataAccess> HostLogWriter<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

/// Buffers one event and hands it to the host when dropped.
#[derive(Debug)]
pub struct HostLine<'a, H: DataAccess> {
    host: &'a H,
    buf: Vec<u8>,
}

impl<H: DataAccess> io::Write for HostLine<'_, H> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.host.debug_string(&String::from_utf8_lossy(&self.buf));
            self.buf.clear();
        }
        Ok(())
    }
}

impl<H: DataAccess> Drop for HostLine<'_, H> {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

impl<'a, H: DataAccess + 'a> MakeWriter<'a> for HostLogWriter<H> {
    type Writer = HostLine<'a, H>;

    fn make_writer(&'a self) -> Self::Writer {
        HostLine {
            host: &self.host,
            buf: Vec::new(),
        }
    }
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(DatarefError::Logging {
            message: format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                level
            ),
        }),
    }
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let level = parse_log_level(&config.level)?;
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase())))
}

/// Build the formatting layer described by `config`, writing through `host`
/// when the target is the host log.
pub fn layer<S, H>(config: &LoggingConfig, host: H) -> Result<BoxedLayer<S>>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    H: DataAccess + Send + Sync + 'static,
{
    let filter = env_filter(config)?;

    let writer = match config.target {
        LogTarget::Host => BoxMakeWriter::new(HostLogWriter::new(host)),
        LogTarget::Stderr => BoxMakeWriter::new(io::stderr),
    };

    // The simulator log is a plain text file
    let ansi = config.target == LogTarget::Stderr && config.format == LogFormat::Pretty;
    let base = fmt::layer().with_writer(writer).with_ansi(ansi);

    let layer = match config.format {
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
        LogFormat::Json => base.json().with_filter(filter).boxed(),
    };

    Ok(layer)
}

/// Install a global subscriber built from `config`.
///
/// Idempotent: if a global subscriber is already set this returns `Ok(())`,
/// so several plugins in one process (or several tests) can all call it.
pub fn init<H>(config: &LoggingConfig, host: H) -> Result<()>
where
    H: DataAccess + Send + Sync + 'static,
{
    let layer = layer(config, host)?;

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            if e.to_string().contains("a global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(DatarefError::Logging {
                    message: format!("Failed to initialize tracing: {}", e),
                })
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("chatty").is_err());
    }

    #[cfg(feature = "mock")]
    mod host_writer {
        use super::super::*;
        use crate::host::MockHost;
        use serial_test::serial;

        fn config(format: LogFormat) -> LoggingConfig {
            LoggingConfig {
                level: "debug".to_string(),
                format,
                target: LogTarget::Host,
            }
        }

        #[test]
        fn test_writer_flushes_one_line_per_event() {
            use std::io::Write;

            let host = MockHost::new();
            let writer = HostLogWriter::new(host.clone());
            {
                let mut line = writer.make_writer();
                write!(line, "hello ").unwrap();
                writeln!(line, "world").unwrap();
            }
            assert_eq!(host.log_lines(), vec!["hello world\n".to_string()]);
        }

        #[test]
        #[serial]
        fn test_events_reach_host_log() {
            let host = MockHost::new();
            let subscriber =
                tracing_subscriber::registry().with(layer(&config(LogFormat::Compact), host.clone()).unwrap());

            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(dataref = "sim/test", "resolved");
            });

            let lines = host.log_lines();
            assert_eq!(lines.len(), 1);
            assert!(lines[0].contains("resolved"));
            assert!(lines[0].contains("sim/test"));
        }

        #[test]
        #[serial]
        fn test_json_format() {
            let host = MockHost::new();
            let subscriber =
                tracing_subscriber::registry().with(layer(&config(LogFormat::Json), host.clone()).unwrap());

            tracing::subscriber::with_default(subscriber, || {
                tracing::warn!("replaced");
            });

            let lines = host.log_lines();
            assert_eq!(lines.len(), 1);
            assert!(lines[0].trim_end().starts_with('{'));
            assert!(lines[0].contains("\"replaced\""));
        }

        #[test]
        fn test_invalid_level_rejected() {
            let mut bad = config(LogFormat::Pretty);
            bad.level = "chatty".to_string();
            let result = layer::<tracing_subscriber::Registry, _>(&bad, MockHost::new());
            assert!(matches!(result, Err(DatarefError::Logging { .. })));
        }
    }
}

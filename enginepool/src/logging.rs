// Logging for the engine pool
//
// Built on the `tracing` ecosystem. The pool itself only emits events and
// spans; installing a subscriber is left to the owning process, which can use
// the helpers below.
//
// # Usage Examples
//
// ```rust
// use enginepool::logging;
//
// // INFO level, human-readable console output
// logging::init(logging::LogConfig::default());
//
// // Or one of the presets
// logging::init_development();
// logging::init_production();
// ```
//
// Worker and engine threads are plain OS threads; the pool carries the
// dispatcher that was current when it started them (see `current_subscriber`),
// so scoped subscribers installed by tests also see their events.

use std::io;
use std::sync::Once;
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for the logging system
///
/// # Examples
///
/// ```rust
/// use enginepool::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     target_filters: Some("enginepool::pool=trace".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id
    pub show_thread_info: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            target_filters: None,
        }
    }
}

// Initialization guard to ensure we only initialize once
static INIT: Once = Once::new();

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::from_default_env().add_directive(config.level.into());
    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            if let Ok(directive) = filter.parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }
    env_filter
}

/// Initialize the logging system with the given configuration
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter(&config));

        // Worker threads are named after their index, so thread names are
        // the quickest way to tell workers apart.
        let subscriber: Box<dyn Subscriber + Send + Sync> = if config.json_format {
            Box::new(registry.with(fmt::layer().json().flatten_event(true)))
        } else {
            Box::new(
                registry.with(
                    fmt::layer()
                        .with_ansi(atty::is(atty::Stream::Stdout))
                        .with_file(config.show_file_line)
                        .with_line_number(config.show_file_line)
                        .with_thread_names(config.show_thread_info)
                        .with_thread_ids(config.show_thread_info),
                ),
            )
        };

        set_global_subscriber(subscriber);
    });
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` in append mode as a log sink.
pub fn file_writer(path: &str) -> io::Result<Box<dyn io::Write + Send + Sync + 'static>> {
    use std::fs::OpenOptions;

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Box::new(file))
}

/// Initialize logging with both console and file output
///
/// The file is checked up front; console output respects ANSI detection while
/// file output is always plain.
pub fn init_with_file(config: LogConfig, log_file: &str) -> Result<(), io::Error> {
    drop(file_writer(log_file)?);

    INIT.call_once(|| {
        let console_layer = fmt::layer()
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info);

        let log_file_path = log_file.to_string();
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || match file_writer(&log_file_path) {
                Ok(writer) => writer,
                Err(_) => Box::new(std::io::stderr()),
            })
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer)
            .with(file_layer);

        set_global_subscriber(subscriber);
    });

    Ok(())
}

/// DEBUG for the crate, TRACE for state transitions, colored output.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("enginepool=debug,enginepool::pool::state=trace".to_string()),
        ..Default::default()
    });
}

/// INFO level, JSON output, no file/line information.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        target_filters: None,
    });
}

/// Warnings and errors only, to keep test output clean.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        show_thread_info: false,
        ..Default::default()
    });
}

/// Span covering one supervisor operation.
///
/// ```rust
/// let span = enginepool::pool_span!(uuid::Uuid::new_v4(), 4);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! pool_span {
    ($pool_id:expr, $num_workers:expr) => {
        tracing::info_span!("pool", id = %$pool_id, workers = $num_workers)
    };
}

/// Log a worker lifecycle event.
///
/// ```rust
/// enginepool::log_worker!(3, "context created");
/// enginepool::log_worker!(3, "job panicked", panic = "boom");
/// ```
#[macro_export]
macro_rules! log_worker {
    ($index:expr, $event:expr) => {
        tracing::debug!(worker = $index, event = $event)
    };
    ($index:expr, $event:expr, $($fields:tt)*) => {
        tracing::debug!(worker = $index, event = $event, $($fields)*)
    };
}

/// Log an error with optional context fields.
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {
        tracing::error!(error = %$error)
    };
    ($error:expr, $($fields:tt)*) => {
        tracing::error!(error = %$error, $($fields)*)
    };
}

/// The dispatcher current on this thread.
///
/// Captured before spawning worker and engine threads so their events reach the
/// same subscriber.
#[inline]
pub fn current_subscriber() -> tracing::Dispatch {
    tracing::dispatcher::get_default(|d| d.clone())
}

pub use tracing::{debug, error, info, trace, warn};

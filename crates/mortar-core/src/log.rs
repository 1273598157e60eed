//! Structured JSON logging
//!
//! [`JsonLogger`] writes one JSON object per line:
//!
//! ```json
//! {"timestamp":"2024-04-22T15:04:05Z","level":"INFO","message":"Request processed","fields":{"method":"GET"}}
//! ```
//!
//! There is no process-wide logger. Build an instance at startup and hand it
//! (usually behind an `Arc`) to the components that log through it.
//!
//! # Example
//!
//! ```rust
//! use mortar_core::{JsonLogger, Level};
//! use serde_json::json;
//!
//! let logger = JsonLogger::stdout()
//!     .with_level(Level::Debug)
//!     .with_field("service", "api")
//!     .with_field("version", "1.0.0");
//!
//! logger.info("Processing request", json!({ "method": "GET", "path": "/api/users" }));
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Verbose debugging information
    Trace,
    /// Debugging information
    Debug,
    /// General operational information
    #[default]
    Info,
    /// Potentially harmful situations
    Warn,
    /// Serious problems
    Error,
    /// Critical errors. Logged, but the process is left running.
    Fatal,
}

/// Returned when a level name is not recognised
#[derive(Debug, Clone, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

impl Level {
    /// Upper-case level name as written to the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Parse a level name, falling back to [`Level::Info`] for unknown names.
    pub fn parse_or_info(name: &str) -> Level {
        match name.parse() {
            Ok(level) => level,
            Err(err) => {
                tracing::warn!(error = %err, "defaulting log level to INFO");
                Level::Info
            }
        }
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_uppercase().as_str() {
            "TRACE" => Level::Trace,
            "DEBUG" => Level::Debug,
            "INFO" => Level::Info,
            "WARN" | "WARNING" => Level::Warn,
            "ERROR" => Level::Error,
            "FATAL" => Level::Fatal,
            _ => return Err(ParseLevelError(s.to_string())),
        };
        Ok(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    level: Level,
    message: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

/// Structured logger writing JSON lines to an owned sink.
///
/// Entries below the configured level are dropped before any serialization
/// happens. Logger-wide fields are merged into every entry; per-call fields
/// win on key collisions.
pub struct JsonLogger {
    level: Level,
    fields: Map<String, Value>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLogger {
    /// Create a logger writing to `out` at [`Level::Info`]
    pub fn new<W>(out: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            level: Level::Info,
            fields: Map::new(),
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Create a logger writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Set the minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Add a field included in every entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add several fields included in every entry
    pub fn with_fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in fields {
            self.fields.insert(key.into(), value.into());
        }
        self
    }

    /// The configured minimum level
    pub fn level(&self) -> Level {
        self.level
    }

    /// Whether an entry at `level` would be written
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Write an entry.
    ///
    /// `fields` is usually a `json!({...})` object. `Value::Null` means no
    /// per-call fields; any other non-object value is stored under `"value"`.
    pub fn log(&self, level: Level, message: &str, fields: Value) {
        if !self.enabled(level) {
            return;
        }

        let mut merged = self.fields.clone();
        match fields {
            Value::Null => {}
            Value::Object(map) => merged.extend(map),
            other => {
                merged.insert("value".to_string(), other);
            }
        }

        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            level,
            message,
            fields: merged,
        };

        let mut line = match serde_json::to_vec(&entry) {
            Ok(line) => line,
            Err(err) => {
                eprintln!("Error marshaling log entry: {err}");
                return;
            }
        };
        line.push(b'\n');

        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = out.write_all(&line).and_then(|_| out.flush()) {
            eprintln!("Error writing log entry: {err}");
        }
    }

    /// Log at trace level
    pub fn trace(&self, message: &str, fields: Value) {
        self.log(Level::Trace, message, fields);
    }

    /// Log at debug level
    pub fn debug(&self, message: &str, fields: Value) {
        self.log(Level::Debug, message, fields);
    }

    /// Log at info level
    pub fn info(&self, message: &str, fields: Value) {
        self.log(Level::Info, message, fields);
    }

    /// Log at warn level
    pub fn warn(&self, message: &str, fields: Value) {
        self.log(Level::Warn, message, fields);
    }

    /// Log at error level
    pub fn error(&self, message: &str, fields: Value) {
        self.log(Level::Error, message, fields);
    }

    /// Log at fatal level. The caller decides whether to terminate.
    pub fn fatal(&self, message: &str, fields: Value) {
        self.log(Level::Fatal, message, fields);
    }

    /// Log an HTTP exchange at a level chosen from its status code.
    ///
    /// `>= 500` is an error (`"<prefix> failed"`), `>= 400` a warning
    /// (`"<prefix> warning"`), anything else info (`"<prefix> completed"`).
    pub fn log_by_status(&self, status: u16, prefix: &str, fields: Value) {
        match status {
            500.. => self.error(&format!("{prefix} failed"), fields),
            400..=499 => self.warn(&format!("{prefix} warning"), fields),
            _ => self.info(&format!("{prefix} completed"), fields),
        }
    }
}

impl fmt::Debug for JsonLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLogger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Log an HTTP exchange through `tracing`, choosing the level from the status.
///
/// Same routing as [`JsonLogger::log_by_status`]. `trace.id`, the method,
/// the route and the status are recorded as their own fields; everything
/// else is carried in `fields` as JSON.
pub fn log_by_status(status: u16, prefix: &str, fields: &Value) {
    let text = |key: &str| fields.get(key).and_then(Value::as_str);
    let trace_id = text("trace.id");
    let method = text("http.request.method");
    let route = text("http.route");

    macro_rules! emit {
        ($level:ident, $suffix:literal) => {
            tracing::$level!(
                trace.id = trace_id,
                http.request.method = method,
                http.route = route,
                http.response.status_code = status,
                fields = %fields,
                "{} {}",
                prefix,
                $suffix
            )
        };
    }

    match status {
        500.. => emit!(error, "failed"),
        400..=499 => emit!(warn, "warning"),
        _ => emit!(info, "completed"),
    }
}

/// Where request/response log entries go
#[derive(Debug, Clone, Default)]
pub enum LogSink {
    /// Emit `tracing` events
    #[default]
    Tracing,
    /// Write through an explicit [`JsonLogger`]
    Json(Arc<JsonLogger>),
}

impl LogSink {
    /// Route an HTTP exchange to the sink at a level chosen from the status
    pub fn by_status(&self, status: u16, prefix: &str, fields: Value) {
        match self {
            LogSink::Tracing => log_by_status(status, prefix, &fields),
            LogSink::Json(logger) => logger.log_by_status(status, prefix, fields),
        }
    }

    /// Emit a warning
    pub fn warn(&self, message: &str, fields: Value) {
        match self {
            LogSink::Tracing => tracing::warn!(fields = %fields, "{}", message),
            LogSink::Json(logger) => logger.warn(message, fields),
        }
    }
}

impl From<Arc<JsonLogger>> for LogSink {
    fn from(logger: Arc<JsonLogger>) -> Self {
        LogSink::Json(logger)
    }
}

impl From<JsonLogger> for LogSink {
    fn from(logger: JsonLogger) -> Self {
        LogSink::Json(Arc::new(logger))
    }
}

/// In-memory sink for asserting on log output in tests
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl CaptureWriter {
    /// Create an empty capture buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Each written line parsed as JSON
    pub fn entries(&self) -> Vec<Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

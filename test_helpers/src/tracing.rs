//! Capture `tracing` events emitted during a test so they can be asserted on.
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};

use observability_deps::tracing::{
    self,
    field::Field,
    span::{Attributes, Id, Record},
    subscriber::{DefaultGuard, Subscriber},
    Event, Level,
};
use parking_lot::Mutex;

/// A structured log field value.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Bool(bool),
    Float(f64),
    SignedInt(i128),
    String(String),
    UnsignedInt(u128),
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::SignedInt(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s}"),
            Self::UnsignedInt(u) => write!(f, "{u}"),
        }
    }
}

/// A single captured event as ordered key-value pairs.
///
/// The event message is stored under the `message` key.
pub type LogLine = Vec<(String, LogValue)>;

type SharedLogLines = Arc<Mutex<Vec<LogLine>>>;

/// Builder/config for [`TracingCapture`].
#[derive(Debug, Clone)]
pub struct TracingCaptureConfig {
    add_level: bool,
    add_target: bool,
    min_level: Level,
    target_prefixes: HashSet<&'static str>,
}

impl Default for TracingCaptureConfig {
    fn default() -> Self {
        Self {
            add_level: true,
            add_target: false,
            min_level: Level::TRACE,
            target_prefixes: HashSet::default(),
        }
    }
}

impl TracingCaptureConfig {
    #[must_use]
    pub fn build(self) -> TracingCapture {
        let capture = TracingCapture {
            lines: Default::default(),
            config: Arc::new(self),
            guards: Default::default(),
        };

        capture.register_in_current_thread();

        capture
    }

    /// Include the event target in every line.
    #[must_use]
    pub fn add_target(self) -> Self {
        Self {
            add_target: true,
            ..self
        }
    }

    /// Drop events less severe than `level`.
    #[must_use]
    pub fn min_level(self, level: Level) -> Self {
        Self {
            min_level: level,
            ..self
        }
    }

    /// Only keep events whose target starts with `prefix`.
    ///
    /// Calling this multiple times keeps events matching ANY of the prefixes.
    #[must_use]
    pub fn filter_target_prefix(mut self, prefix: &'static str) -> Self {
        self.target_prefixes.insert(prefix);
        self
    }

    fn accepts(&self, md: &tracing::Metadata<'_>) -> bool {
        // `Level` orders TRACE as the greatest, so "at least as severe" is `<=`
        if md.level() > &self.min_level {
            return false;
        }

        self.target_prefixes.is_empty()
            || self
                .target_prefixes
                .iter()
                .any(|prefix| md.target().starts_with(prefix))
    }
}

/// Captures tracing [`Event`]s of the current thread.
///
/// Upon creation it registers itself as the thread-local default
/// subscriber, the previous subscriber is restored on drop.
#[derive(Debug)]
pub struct TracingCapture {
    lines: SharedLogLines,
    config: Arc<TracingCaptureConfig>,
    guards: Mutex<Vec<DefaultGuard>>,
}

impl TracingCapture {
    /// Create a new capture with default config and register it.
    #[expect(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Get builder.
    pub fn builder() -> TracingCaptureConfig {
        TracingCaptureConfig::default()
    }

    /// Registers the capture in the current thread.
    ///
    /// Needed when the code under test runs on a thread other than the one
    /// that built the capture.
    pub fn register_in_current_thread(&self) {
        let subscriber = TracingCaptureSubscriber {
            lines: Arc::clone(&self.lines),
            config: Arc::clone(&self.config),
        };

        let guard = tracing::subscriber::set_default(subscriber);

        self.guards.lock().push(guard);
    }

    /// Captured lines.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().clone()
    }

    /// Captured lines as maps for easier assertion.
    pub fn lines_as_maps(&self) -> Vec<BTreeMap<String, LogValue>> {
        self.lines()
            .into_iter()
            .map(|line| line.into_iter().collect())
            .collect()
    }

    /// Lines whose `message` field equals `message`.
    pub fn lines_with_message(&self, message: &str) -> Vec<BTreeMap<String, LogValue>> {
        self.lines_as_maps()
            .into_iter()
            .filter(|line| {
                matches!(
                    line.get("message"),
                    Some(LogValue::String(m)) if m == message
                )
            })
            .collect()
    }
}

impl fmt::Display for TracingCapture {
    /// All captured lines, one per row, as `key = value;` pairs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines().into_iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            for (k, v) in line {
                write!(f, "{k} = {v}; ")?;
            }
        }

        Ok(())
    }
}

struct TracingCaptureSubscriber {
    lines: SharedLogLines,
    config: Arc<TracingCaptureConfig>,
}

impl Subscriber for TracingCaptureSubscriber {
    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    // Filtering happens in `event`, returning `false` here would poison the
    // global callsite interest cache for other captures.
    fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
        true
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let md = event.metadata();
        if !self.config.accepts(md) {
            return;
        }

        let mut v = LineVisitor::default();
        if self.config.add_level {
            v.record_string("level", md.level().to_string());
        }
        if self.config.add_target {
            v.record_string("target", md.target().to_owned());
        }
        event.record(&mut v);

        self.lines.lock().push(v.line);
    }

    fn enter(&self, _span: &Id) {}
    fn exit(&self, _span: &Id) {}
}

#[derive(Debug, Default)]
struct LineVisitor {
    line: LogLine,
}

impl LineVisitor {
    fn record_string(&mut self, key: &str, value: String) {
        self.line.push((key.to_owned(), LogValue::String(value)));
    }
}

impl tracing::field::Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_string(field.name(), format!("{value:?}"))
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_string(field.name(), value.to_owned())
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.line
            .push((field.name().to_owned(), LogValue::Bool(value)));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.line
            .push((field.name().to_owned(), LogValue::Float(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_i128(field, value as i128);
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.line
            .push((field.name().to_owned(), LogValue::SignedInt(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_u128(field, value as u128);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.line
            .push((field.name().to_owned(), LogValue::UnsignedInt(value)));
    }
}

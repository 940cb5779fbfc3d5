//! Record encoders for the two supported encodings.
//!
//! Console:
//! ```text
//! [2024-12-28T15:04:05.123]	INFO	server/listener.rs:42   	listening	{"port":8080}
//! ```
//!
//! JSON:
//! ```json
//! {"time":"2024-12-28T15:04:05.123+00:00","level":"INFO","caller":"server/listener.rs:42","message":"listening","port":8080,"target":"app::server"}
//! ```

use std::fmt;

use chrono::{Local, SecondsFormat};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::logger::color::{CallerAligner, Color, colored_level};
use crate::logger::Level;

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const CALLER_KEY: &str = "caller";
pub const MESSAGE_KEY: &str = "message";
pub const TARGET_KEY: &str = "target";

pub const CONSOLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const UNKNOWN_CALLER: &str = "undefined";

static CALLER_ALIGNER: CallerAligner = CallerAligner::new();

pub fn level_of(metadata: &Metadata<'_>) -> Level {
    match *metadata.level() {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

/// Last directory plus file name, e.g. `logger/format.rs:12`.
pub fn trimmed_caller(metadata: &Metadata<'_>) -> String {
    match metadata.file() {
        Some(file) => trim_path(file, metadata.line()),
        None => UNKNOWN_CALLER.to_string(),
    }
}

pub fn trim_path(file: &str, line: Option<u32>) -> String {
    let normalized = file.replace('\\', "/");
    let mut parts = normalized.rsplitn(3, '/');
    let name = parts.next().unwrap_or_default();
    let short = match parts.next() {
        Some(dir) => format!("{dir}/{name}"),
        None => name.to_string(),
    };

    match line {
        Some(line) => format!("{short}:{line}"),
        None => short,
    }
}

/// An explicit `caller` field wins over the event's own location.
fn resolve_caller(visitor: &mut FieldVisitor, metadata: &Metadata<'_>) -> String {
    match visitor.fields.shift_remove(CALLER_KEY) {
        Some(Value::String(caller)) => caller,
        _ => trimmed_caller(metadata),
    }
}

/// Colored, tab separated records for humans.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let paint = |color: Color, text: &str| {
            if ansi { color.paint(text) } else { text.to_string() }
        };

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let time = Local::now().format(CONSOLE_TIME_FORMAT).to_string();
        let level = level_of(meta);
        let level = if ansi {
            colored_level(level)
        } else {
            level.as_str().to_string()
        };
        let caller = CALLER_ALIGNER.pad(&resolve_caller(&mut visitor, meta));

        write!(
            writer,
            "[{}]\t{}\t{}\t{}",
            paint(Color::Cyan, &time),
            level,
            paint(Color::Magenta, &caller),
            visitor.message.unwrap_or_default()
        )?;

        if !visitor.fields.is_empty() {
            let fields = serde_json::to_string(&visitor.fields).map_err(|_| fmt::Error)?;
            write!(writer, "\t{fields}")?;
        }
        writeln!(writer)
    }
}

/// One JSON object per record.
#[derive(Debug, Default, Clone)]
pub struct JsonFormatter {
    time_format: Option<String>,
}

impl JsonFormatter {
    pub fn new(time_format: Option<String>) -> Self {
        Self { time_format }
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        match &self.time_format {
            Some(layout) => now.format(layout).to_string(),
            None => now.to_rfc3339_opts(SecondsFormat::Millis, false),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = resolve_caller(&mut visitor, meta);

        let mut entry = Map::new();
        entry.insert(TIME_KEY.into(), Value::String(self.timestamp()));
        entry.insert(LEVEL_KEY.into(), Value::String(level_of(meta).as_str().into()));
        entry.insert(CALLER_KEY.into(), Value::String(caller));
        entry.insert(
            MESSAGE_KEY.into(),
            Value::String(visitor.message.unwrap_or_default()),
        );
        for (key, value) in visitor.fields {
            entry.insert(field_key(key), value);
        }
        entry.insert(TARGET_KEY.into(), Value::String(meta.target().into()));

        let line = serde_json::to_string(&entry).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// User fields named like a record key are kept under `fields.<name>`.
fn field_key(key: String) -> String {
    if [TIME_KEY, LEVEL_KEY, CALLER_KEY, MESSAGE_KEY, TARGET_KEY].contains(&key.as_str()) {
        format!("fields.{key}")
    } else {
        key
    }
}

/// Collects event fields into JSON values.
#[derive(Default)]
pub struct FieldVisitor {
    pub message: Option<String>,
    pub fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_KEY {
            self.message = Some(format!("{value:?}"));
        } else {
            self.insert(field, Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_KEY {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

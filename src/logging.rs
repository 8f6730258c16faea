// src/logging.rs

//! Logger construction for `fsevent` using `tracing` + `tracing-subscriber`.
//!
//! The library never installs a global subscriber. [`build_logger`] returns a
//! [`Logger`] value that owns its own [`Dispatch`]; callers pass it down
//! explicitly and run their work inside [`Logger::scope`] or
//! [`Logger::in_scope`].
//!
//! Every record carries `application` and `hostname`:
//! - text: through a root span, rendered as `fsevent{application=.. hostname=..}:`
//! - JSON: as top-level keys written by [`JsonRecord`]
//!
//! The severity floor is fixed at INFO.

use std::fmt::{self, Write as _};
use std::future::Future;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::instrument::{Instrumented, WithDispatch, WithSubscriber};
use tracing::{info_span, Dispatch, Event, Instrument, Span, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

use crate::config::LogFormat;

/// Used when the host name cannot be determined.
pub const HOSTNAME_SENTINEL: &str = "err-hostname";

/// Shared, read-only structured logger.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
    span: Span,
}

impl Logger {
    /// Wrap `fut` so that it logs through this logger, inside its root span.
    pub fn scope<F: Future>(&self, fut: F) -> WithDispatch<Instrumented<F>> {
        fut.instrument(self.span.clone())
            .with_subscriber(self.dispatch.clone())
    }

    /// Run `f` with this logger as the current dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }
}

/// Build a logger writing to `writer` in the given `format`.
///
/// `application` is attached to every record, together with the host name
/// from [`resolve_hostname`].
pub fn build_logger<W>(writer: W, format: LogFormat, application: &str) -> Logger
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let hostname = resolve_hostname();
    let builder = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer);

    let dispatch = match format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(
            builder
                .event_format(JsonRecord {
                    application: application.to_string(),
                    hostname: hostname.clone(),
                })
                .finish(),
        ),
    };

    let span = tracing::dispatcher::with_default(&dispatch, || {
        info_span!("fsevent", application = %application, hostname = %hostname)
    });

    Logger { dispatch, span }
}

/// Host name of this machine, or [`HOSTNAME_SENTINEL`] if the lookup fails.
pub fn resolve_hostname() -> String {
    match hostname::get() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        _ => HOSTNAME_SENTINEL.to_string(),
    }
}

/// Program name as invoked (`argv[0]`), falling back to the crate name.
pub fn application_name() -> String {
    std::env::args_os()
        .next()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// One JSON object per line.
///
/// Dotted field names become nested objects, so `event.name` and `event.op`
/// are written as `"event": {"name": .., "op": ..}`. Spans are not rendered;
/// the process identity is written from the formatter itself.
struct JsonRecord {
    application: String,
    hostname: String,
}

impl<S, N> FormatEvent<S, N> for JsonRecord
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
        let mut timestamp = String::new();
        SystemTime.format_time(&mut Writer::new(&mut timestamp))?;

        let mut record = Map::new();
        record.insert("timestamp".into(), Value::String(timestamp));
        record.insert(
            "level".into(),
            Value::String(event.metadata().level().to_string()),
        );
        record.insert("application".into(), Value::String(self.application.clone()));
        record.insert("hostname".into(), Value::String(self.hostname.clone()));
        event.record(&mut FieldGroups(&mut record));

        writeln!(writer, "{}", Value::Object(record))
    }
}

struct FieldGroups<'a>(&'a mut Map<String, Value>);

impl Visit for FieldGroups<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        insert_grouped(self.0, field.name(), Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        insert_grouped(self.0, field.name(), Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        insert_grouped(self.0, field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        insert_grouped(self.0, field.name(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        insert_grouped(self.0, field.name(), Value::String(format!("{value:?}")));
    }
}

/// Insert `value` at the dotted path `name`.
///
/// A scalar already sitting where a group is needed moves under the empty
/// key of that group, and vice versa.
fn insert_grouped(map: &mut Map<String, Value>, name: &str, value: Value) {
    match name.split_once('.') {
        None => match map.get_mut(name) {
            Some(Value::Object(group)) => {
                group.insert(String::new(), value);
            }
            _ => {
                map.insert(name.to_string(), value);
            }
        },
        Some((group, rest)) => {
            let slot = map
                .entry(group.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                let scalar = slot.take();
                *slot = Value::Object(Map::from_iter([(String::new(), scalar)]));
            }
            if let Value::Object(inner) = slot {
                insert_grouped(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn dotted_names_nest_into_groups() {
        let mut map = Map::new();
        insert_grouped(&mut map, "event.name", json!("/w/a"));
        insert_grouped(&mut map, "event.op", json!("CREATE"));
        insert_grouped(&mut map, "message", json!("change observed"));

        assert_eq!(
            Value::Object(map),
            json!({"event": {"name": "/w/a", "op": "CREATE"}, "message": "change observed"})
        );
    }

    #[test]
    fn scalar_and_group_under_same_name_share_the_group() {
        let mut map = Map::new();
        insert_grouped(&mut map, "event", json!("overflow"));
        insert_grouped(&mut map, "event.op", json!("WRITE"));
        assert_eq!(map["event"], json!({"": "overflow", "op": "WRITE"}));

        let mut map = Map::new();
        insert_grouped(&mut map, "event.op", json!("WRITE"));
        insert_grouped(&mut map, "event", json!("overflow"));
        assert_eq!(map["event"], json!({"": "overflow", "op": "WRITE"}));
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!resolve_hostname().is_empty());
    }
}

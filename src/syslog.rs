//! Syslog (RFC 5424) sink for tracing events.
//!
//! Each event becomes one datagram:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID [meta@47450 key="value"] MSG
//! ```
//!
//! Levels map to severities ERROR=3, WARN=4, INFO=6, DEBUG/TRACE=7. An event
//! carrying `critical = true` is raised to severity 2.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::{self, Write};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

/// IANA Private Enterprise Number used for the structured data id.
const STRUCTURED_DATA_PEN: u32 = 47450;

/// `user-level messages` facility.
pub const FACILITY_USER: u8 = 1;

/// Default system log socket.
pub const DEV_LOG: &str = "/dev/log";

#[derive(Debug, Clone)]
pub struct SyslogConfig {
    pub facility: u8,
    pub hostname: String,
    pub app_name: String,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            facility: FACILITY_USER,
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "-".to_string()),
            app_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// A tracing layer that writes each event as a syslog message.
pub struct SyslogLayer<W: Write + Send + 'static> {
    config: SyslogConfig,
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> SyslogLayer<W> {
    pub fn new(config: SyslogConfig, writer: W) -> Self {
        Self {
            config,
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for SyslogLayer<W>
where
    S: Subscriber,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let message = format_syslog_message(
            &self.config,
            severity(metadata.level(), visitor.critical),
            metadata.target(),
            &visitor.fields,
            visitor.message.as_deref(),
        );

        // The system log cannot report its own failures anywhere useful.
        let _ = self.writer.lock().write_all(message.as_bytes());
    }
}

/// Datagram connection to the local syslog daemon.
#[cfg(unix)]
pub struct DevLog {
    socket: std::os::unix::net::UnixDatagram,
}

#[cfg(unix)]
impl DevLog {
    pub fn connect(path: &str) -> io::Result<Self> {
        let socket = std::os::unix::net::UnixDatagram::unbound()?;
        socket.connect(path)?;
        Ok(Self { socket })
    }
}

#[cfg(unix)]
impl Write for DevLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
    message: Option<String>,
    critical: bool,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered.trim_matches('"').to_string());
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "critical" {
            self.critical = value;
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

fn severity(level: &Level, critical: bool) -> u8 {
    if critical {
        return 2;
    }
    match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

/// Build one RFC 5424 message.
pub fn format_syslog_message(
    config: &SyslogConfig,
    severity: u8,
    target: &str,
    fields: &BTreeMap<String, String>,
    message: Option<&str>,
) -> String {
    let mut output = String::with_capacity(256);
    let pri = u16::from(config.facility) * 8 + u16::from(severity);
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

    let _ = write!(
        output,
        "<{}>1 {} {} {} {} {}",
        pri,
        timestamp,
        sanitize_header(&config.hostname, 255),
        sanitize_header(&config.app_name, 48),
        std::process::id(),
        sanitize_header(target, 32),
    );

    if fields.is_empty() {
        output.push_str(" -");
    } else {
        let _ = write!(output, " [meta@{}", STRUCTURED_DATA_PEN);
        for (key, value) in fields {
            let _ = write!(
                output,
                " {}=\"{}\"",
                sanitize_header(key, 32),
                escape_sd_value(value)
            );
        }
        output.push(']');
    }

    if let Some(msg) = message {
        output.push(' ');
        output.push_str(msg);
    }
    output
}

/// Printable ASCII without spaces, "-" when nothing is left.
fn sanitize_header(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .filter(|c| ('\x21'..='\x7e').contains(c) && !matches!(c, '=' | ']' | '"'))
        .take(max_len)
        .collect();
    if sanitized.is_empty() {
        "-".to_string()
    } else {
        sanitized
    }
}

fn escape_sd_value(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    fn config() -> SyslogConfig {
        SyslogConfig {
            facility: FACILITY_USER,
            hostname: "collector01".to_string(),
            app_name: "flowkeeper".to_string(),
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            self.0.lock().push(b'\n');
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_message_header_and_structured_data() {
        let mut fields = BTreeMap::new();
        fields.insert("path".to_string(), "/data/in/a \"b\"".to_string());
        let msg = format_syslog_message(
            &config(),
            4,
            "flowkeeper::services::retention",
            &fields,
            Some("Failed to delete expired file"),
        );

        assert!(msg.starts_with("<12>1 "));
        assert!(msg.contains(" collector01 flowkeeper "));
        assert!(msg.contains("[meta@47450 path=\"/data/in/a \\\"b\\\"\"]"));
        assert!(msg.ends_with(" Failed to delete expired file"));
    }

    #[test]
    fn test_message_without_fields_uses_nil_value() {
        let msg = format_syslog_message(&config(), 6, "t", &BTreeMap::new(), Some("hello"));
        assert!(msg.contains(" t - hello"));
        assert!(msg.starts_with("<14>1 "));
    }

    #[test]
    fn test_layer_maps_levels_and_critical_flag() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry()
            .with(SyslogLayer::new(config(), captured.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(deleted = 3u64, "Retention sweep finished");
            tracing::error!(critical = true, "Repository root vanished");
        });

        let text = String::from_utf8(captured.0.lock().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("<14>1 "));
        assert!(lines[0].contains("deleted=\"3\""));
        assert!(lines[1].starts_with("<10>1 "));
        assert!(!lines[1].contains("critical"));
    }
}

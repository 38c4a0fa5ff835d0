//! Tracing setup: a human console layer plus an optional system log layer

use crate::syslog::{SyslogConfig, SyslogLayer};
use tracing::{warn, Level};
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Events logged under this target reach the system log only.
pub const AUDIT_TARGET: &str = "flowkeeper::audit";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Log debug events on the console
    pub verbose: bool,
    /// No console layer at all
    pub silent: bool,
    /// ANSI colors on the console
    pub color: bool,
    /// Also send events to the system log
    pub syslog: bool,
}

impl LogConfig {
    fn default_directives(&self) -> String {
        let level = if self.verbose { "debug" } else { "info" };
        format!("flowkeeper={level},tower_http={level},{AUDIT_TARGET}=off")
    }
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init(config: LogConfig) {
    let console_layer = (!config.silent).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.color)
            .with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| config.default_directives().into()),
            )
    });

    let mut syslog_error = None;
    let syslog_layer = if config.syslog {
        match crate::syslog::DevLog::connect(crate::syslog::DEV_LOG) {
            Ok(writer) => Some(
                SyslogLayer::new(SyslogConfig::default(), writer)
                    .with_filter(Targets::new().with_target("flowkeeper", Level::INFO)),
            ),
            Err(e) => {
                syslog_error = Some(e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(syslog_layer)
        .init();

    if let Some(e) = syslog_error {
        warn!(error = %e, "System log unavailable, logging to console only");
    }
}

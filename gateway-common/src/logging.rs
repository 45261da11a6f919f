//! Process-wide logging setup and the zero-log-safe tracing macros.
//!
//! Every call site in this workspace that touches a [`Message`] or
//! [`DeadLetter`] body must go through `internal!`/`incoming!`/`outgoing!`
//! rather than `tracing::info!` directly, so that body content never has a
//! chance to be interpolated into a log line by accident.
//!
//! [`Message`]: gateway_types::Message
//! [`DeadLetter`]: gateway_types::DeadLetter

use std::fmt;

use tracing_subscriber::Layer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Microsecond-precision UTC timestamp.
struct Time;

impl FormatTime for Time {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Utc::now().timestamp_micros())
    }
}

/// Emits a span-scoped event under the `gateway` target.
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {{
        let span = tracing::span!(target: "gateway", $level, "gateway");
        let _enter = span.enter();
        tracing::event!(target: "gateway", $level, $($arg)*);
    }};
}

/// Logs an internal lifecycle event (queue depth, retry counts, status
/// transitions). Never pass body content to this macro.
#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => {
        $crate::log!(tracing::Level::INFO, $($arg)*)
    };
}

/// Logs an inbound event (ingress accepted, telemetry received).
#[macro_export]
macro_rules! incoming {
    ($($arg:tt)*) => {
        $crate::log!(tracing::Level::INFO, $($arg)*)
    };
}

/// Logs an outbound event (dispatch attempt, webhook fired).
#[macro_export]
macro_rules! outgoing {
    ($($arg:tt)*) => {
        $crate::log!(tracing::Level::INFO, $($arg)*)
    };
}

/// Initializes the global `tracing` subscriber.
///
/// Level is read from `LOG_LEVEL` (`warn`/`info`/`trace`, anything else
/// maps to `error`); in debug builds with no `LOG_LEVEL` set, defaults to
/// `TRACE`, in release builds to `INFO`. Output is stdout-only: there is
/// no file handler, ever.
pub fn init() {
    let level = match std::env::var("LOG_LEVEL").as_deref() {
        Ok("warn") => tracing::Level::WARN,
        Ok("info") => tracing::Level::INFO,
        Ok("trace") => tracing::Level::TRACE,
        Ok(_) => tracing::Level::ERROR,
        Err(_) if cfg!(debug_assertions) => tracing::Level::TRACE,
        Err(_) => tracing::Level::INFO,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_timer(Time)
        .with_target(false)
        .with_level(true);

    let target_filter = tracing_subscriber::filter::FilterFn::new(|metadata| {
        metadata.target().starts_with("gateway")
    });

    let layer = fmt_layer
        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level))
        .with_filter(target_filter);

    tracing_subscriber::registry().with(layer).init();
}

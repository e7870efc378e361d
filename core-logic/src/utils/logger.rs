use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target used for one line per transfer attempt.
pub const TX_RESULT_TARGET: &str = "tx_result";

// Dependencies that log every request at INFO.
const QUIET_TARGETS: [&str; 5] = ["sqlx", "reqwest", "hyper", "solana_client", "rustls"];

fn base_filter(default: Level) -> Targets {
    QUIET_TARGETS
        .iter()
        .fold(Targets::new(), |targets, target| {
            targets.with_target(*target, Level::WARN)
        })
        .with_target(TX_RESULT_TARGET, Level::INFO)
        .with_default(default)
}

/// Installs the console + hourly file subscriber.
///
/// The returned guard flushes the file writer on drop and must be held by
/// the caller for the lifetime of the process.
pub fn setup_logger() -> Option<WorkerGuard> {
    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::hourly("logs", "app");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(base_filter(Level::INFO));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(base_filter(Level::INFO));

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

fn paint_keyword(msg: &str, keyword: &str, style: Style) -> String {
    msg.replace(keyword, &style.paint(keyword).to_string())
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
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
        let msg = event_message(event);
        let level = *event.metadata().level();

        let colored_msg = if msg.contains("Sent") {
            paint_keyword(&msg, "Sent", Style::new().fg(Color::LightGreen).bold())
        } else if msg.contains("Failed") {
            paint_keyword(&msg, "Failed", Style::new().fg(Color::LightRed).bold())
        } else if msg.contains("Skipped") {
            paint_keyword(&msg, "Skipped", Style::new().fg(Color::Yellow).bold())
        } else if level == Level::ERROR {
            Color::LightRed.paint(msg).to_string()
        } else if level == Level::WARN {
            Color::Yellow.paint(msg).to_string()
        } else {
            msg
        };

        let time = Color::DarkGray.paint(Local::now().format("%H:%M:%S").to_string());
        writeln!(writer, "[{}] {}", time, colored_msg)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
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
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        writeln!(
            writer,
            "{} [{}] {}",
            timestamp,
            level,
            event_message(event)
        )
    }
}

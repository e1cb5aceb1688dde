use miette::{IntoDiagnostic, Result, WrapErr};
use owo_colors::OwoColorize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    FmtSubscriber,
};

use crate::io::local_offset;

/// Initialize the logging system.
///
/// Logs go to stderr, stdout is left to the interactive session.
pub fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .event_format(ConsoleLogger::new(local_offset()))
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .into_diagnostic()
        .wrap_err("Setting default subscriber failed")
}

/// Pick the log level out of the `-v` count and the quiet flag
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `<time> <level> <module> <fields>`, one line per event
struct ConsoleLogger {
    offset: UtcOffset,
    time_format: &'static [FormatItem<'static>],
}

impl ConsoleLogger {
    fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            time_format: format_description!("[hour]:[minute]:[second]"),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleLogger
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        let now = OffsetDateTime::now_utc().to_offset(self.offset).time();
        let now = now.format(self.time_format).map_err(|_| std::fmt::Error)?;

        // `plgrab::harvester` -> `harvester`
        let module = metadata
            .target()
            .rsplit("::")
            .next()
            .unwrap_or_else(|| metadata.target());

        if writer.has_ansi_escapes() {
            let level = match *metadata.level() {
                Level::ERROR => metadata.level().red().to_string(),
                Level::WARN => metadata.level().yellow().to_string(),
                Level::DEBUG => metadata.level().blue().to_string(),
                Level::TRACE => metadata.level().purple().to_string(),
                _ => metadata.level().green().to_string(),
            };

            write!(&mut writer, "{} {:>5} {} ", now.dimmed(), level, module.cyan())?;
        } else {
            write!(&mut writer, "{} {:>5} {} ", now, metadata.level(), module)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

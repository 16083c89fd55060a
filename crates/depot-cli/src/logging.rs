use std::io::{self, Write};

use nu_ansi_term::Color::{Blue, DarkGray, Magenta, Red, Yellow};
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::{cli::Args, utils::Colored};

/// The message of an event and its remaining fields, in recording order.
#[derive(Default)]
struct EventFields {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

impl EventFields {
    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            name => self.fields.push((name, value)),
        }
    }
}

/// Writes one log line: `info` as the bare message, other levels as
/// `<level>: <message> key=value ...`.
fn write_line(
    writer: &mut impl std::fmt::Write,
    level: Level,
    event: &EventFields,
) -> std::fmt::Result {
    match level {
        Level::INFO => return writeln!(writer, "{}", event.message),
        Level::ERROR => write!(writer, "{}", Colored(Red, "error:")),
        Level::WARN => write!(writer, "{}", Colored(Yellow, "warning:")),
        Level::DEBUG => write!(writer, "{}", Colored(Blue, "debug:")),
        Level::TRACE => write!(writer, "{}", Colored(Magenta, "trace:")),
    }?;

    if !event.message.is_empty() {
        write!(writer, " {}", event.message)?;
    }
    for (name, value) in &event.fields {
        write!(writer, " {}", Colored(DarkGray, format!("{name}={value}")))?;
    }
    writeln!(writer)
}

pub struct LineFormatter;

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        write_line(&mut writer, *event.metadata().level(), &fields)
    }
}

/// Sends `info` to stdout and every other level to stderr.
struct StdioWriter;

enum Stdio {
    Out(io::Stdout),
    Err(io::Stderr),
}

impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stdio::Out(out) => out.write(buf),
            Stdio::Err(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stdio::Out(out) => out.flush(),
            Stdio::Err(err) => err.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for StdioWriter {
    type Writer = Stdio;

    fn make_writer(&'a self) -> Self::Writer {
        Stdio::Out(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        if meta.level() == &Level::INFO {
            Stdio::Out(io::stdout())
        } else {
            Stdio::Err(io::stderr())
        }
    }
}

fn filter_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

pub fn setup_logging(args: &Args) {
    // `DEPOT_LOG` takes precedence over the verbosity flags
    let filter = std::env::var("DEPOT_LOG")
        .unwrap_or_else(|_| format!("depot={}", filter_level(args)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(StdioWriter)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(LineFormatter).finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging was already initialized");
    }
}

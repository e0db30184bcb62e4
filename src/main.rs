//! Purpose: `notedump` CLI entry point.
//! Role: Binary crate root; parses args, runs the catalog check and row decoder, prints records.
//! Invariants: stdout carries only catalog and notification records, one per line.
//! Invariants: Notices, logs, and errors go to stderr (human text on a tty, JSON otherwise).
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: The database is opened read-only for the whole run.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod record_json;

use notedump::api::{
    CatalogEntry, DecodedNotification, Error, ErrorKind, FieldLayout, Inspector, render_text,
    to_exit_code,
};
use notedump::notice::{Notice, NoticeKind, notice_json};
use record_json::{catalog_json, notification_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(RunOutcome::with_code(0));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `notedump --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    inspect(&cli)
        .map_err(add_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "notedump",
    version,
    about = "Dump titles and messages from a local notifications database",
    long_about = None,
    after_help = r#"EXAMPLES
  $ notedump                          # reads ./db
  $ notedump --db ~/snapshots/db --format jsonl
  $ notedump --title-index 4 --message-index 5

Set RUST_LOG=debug to trace each decoded row on stderr."#
)]
struct Cli {
    #[arg(
        long,
        default_value = "db",
        help = "Notifications database file (opened read-only)",
        value_hint = ValueHint::FilePath
    )]
    db: PathBuf,
    #[arg(
        long,
        default_value = "text",
        value_enum,
        help = "stdout record format: text|jsonl"
    )]
    format: OutputFormat,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        default_value_t = FieldLayout::default().title_index,
        help = "Position of the title inside the archive object list"
    )]
    title_index: usize,
    #[arg(
        long,
        default_value_t = FieldLayout::default().message_index,
        help = "Position of the message inside the archive object list"
    )]
    message_index: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Jsonl,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn inspect(cli: &Cli) -> Result<RunOutcome, Error> {
    let layout = FieldLayout {
        title_index: cli.title_index,
        message_index: cli.message_index,
    };
    let inspector = Inspector::open(&cli.db)?.with_layout(layout);

    let catalog = inspector.catalog()?;
    emit_catalog(&catalog, cli.format);
    if catalog.is_empty() {
        emit_notice(&missing_table_notice(&cli.db), cli.color);
    }

    let count = inspector.for_each_notification(|note| {
        if note.unexpected_archiver {
            emit_notice(&unexpected_archiver_notice(&cli.db, &note), cli.color);
        }
        emit_notification(&note, cli.format);
        Ok(())
    })?;
    info!(count, "decoded notifications");
    Ok(RunOutcome::ok())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_catalog(entries: &[CatalogEntry], format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{entries:?}"),
        OutputFormat::Jsonl => emit_json_line(&catalog_json(entries)),
    }
}

fn emit_notification(note: &DecodedNotification, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", notification_line(note)),
        OutputFormat::Jsonl => emit_json_line(&notification_json(note)),
    }
}

fn notification_line(note: &DecodedNotification) -> String {
    format!(
        "{} {} {} {}",
        note.note_id,
        note.app_id,
        render_text(&note.title),
        render_text(&note.message)
    )
}

fn emit_json_line(value: &Value) {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn missing_table_notice(db: &Path) -> Notice {
    let mut details = Map::new();
    details.insert("table".to_string(), json!("notifications"));
    Notice {
        kind: NoticeKind::MissingTable,
        time: notice_time_now().unwrap_or_default(),
        cmd: "notedump".to_string(),
        db: db.display().to_string(),
        message: "catalog has no `notifications` table".to_string(),
        details,
    }
}

fn unexpected_archiver_notice(db: &Path, note: &DecodedNotification) -> Notice {
    let archiver = note.archiver.clone().unwrap_or_default();
    let mut details = Map::new();
    details.insert("note_id".to_string(), json!(note.note_id));
    details.insert("archiver".to_string(), json!(archiver));
    if let Some(version) = note.archive_version {
        details.insert("archive_version".to_string(), json!(version));
    }
    Notice {
        kind: NoticeKind::UnexpectedArchiver,
        time: notice_time_now().unwrap_or_default(),
        cmd: "notedump".to_string(),
        db: db.display().to_string(),
        message: format!(
            "note {} was archived by {archiver}; fields may be misplaced",
            note.note_id
        ),
        details,
    }
}

fn add_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound if err.note_id().is_none() && err.source().is_none() => err
            .with_hint("Run from the directory holding `db`, or pass --db <path>."),
        ErrorKind::NotFound => err.with_hint(
            "The database has no `notifications` table; see the catalog line on stdout.",
        ),
        ErrorKind::Busy => err.with_hint(
            "Database is locked by another process. Retry when it is idle, or inspect a copy.",
        ),
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check file permissions or inspect a copy.")
        }
        ErrorKind::Corrupt if err.note_id().is_some() => err.with_hint(
            "This row's encoded_data is not a keyed archive; rows after it were not read.",
        ),
        ErrorKind::Corrupt => {
            err.with_hint("The file is not a readable SQLite database.")
        }
        ErrorKind::Layout => err.with_hint(
            "Archive layout differs from the assumed one. Try --title-index/--message-index.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path and filesystem."),
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_LOG=debug and share the output if it persists.",
        ),
        ErrorKind::Usage => err,
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (db: {})", notice.message, notice.db);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Busy => "database is busy".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Layout => "unexpected archive layout".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

/// Row and location context shared by the JSON and text error renderings.
fn error_context(err: &Error) -> Vec<(&'static str, Value)> {
    let mut fields = Vec::new();
    if let Some(hint) = err.hint() {
        fields.push(("hint", json!(hint)));
    }
    if let Some(path) = err.path() {
        fields.push(("path", json!(path.display().to_string())));
    }
    if let Some(note_id) = err.note_id() {
        fields.push(("note_id", json!(note_id)));
    }
    if let Some(index) = err.index() {
        fields.push(("index", json!(index)));
    }
    fields
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    for (key, value) in error_context(err) {
        inner.insert(key.to_string(), value);
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    for (key, value) in error_context(err) {
        let label = colorize_label(&format!("{key}:"), use_color, AnsiColor::Yellow);
        match value {
            Value::String(text) => lines.push(format!("{label} {text}")),
            other => lines.push(format!("{label} {other}")),
        }
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

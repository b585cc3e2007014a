//! CLI entry point for `mboxview`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use mboxview::config::{self, Config};
use mboxview::model::mail::{Message, STATUS_DELETED, STATUS_READ};
use mboxview::model::validation::ValidationResult;
use mboxview::parser::mbox::MboxParser;
use mboxview::store::append::append_to_mbox;
use mboxview::store::mailbox::remove_deleted;
use mboxview::store::writer::write_messages_atomic;
use mboxview::store::Mailbox;
use mboxview::validate::{normalize_message, validate_message};

/// Exit status for a failed append (EX_TEMPFAIL), so the delivery agent
/// retries later.
const EXIT_TEMPFAIL: i32 = 75;

#[derive(Parser)]
#[command(
    name = "mboxview",
    version,
    about = "Inspect, validate, fix and update mbox mailboxes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: $MBOXVIEW_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Report missing or malformed From, Date and Message-ID headers
    Validate {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Normalize headers and add missing Message-IDs
    Fix {
        path: PathBuf,
        /// Rewrite the input file
        #[arg(long, conflicts_with = "out")]
        inplace: bool,
        /// Write the result to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Report findings without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Drop messages marked `Status: D`
        #[arg(long)]
        remove_deleted: bool,
        /// Do not print findings or the summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the parsed header fields of one message
    Show {
        path: PathBuf,
        /// Message index (0-based)
        #[arg(long = "msg", value_name = "N")]
        msg: usize,
        #[arg(long)]
        json: bool,
    },
    /// List messages, newest first (deleted messages hidden)
    List {
        mailbox: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the decoded body of one message
    View {
        mailbox: PathBuf,
        index: usize,
        #[arg(long)]
        json: bool,
    },
    /// Set the Status header of one message
    Mark {
        mailbox: PathBuf,
        index: usize,
        /// `read`, `deleted`, or a raw status value such as `O`
        status: String,
        /// Allow modifying the mailbox for this invocation
        #[arg(long)]
        edit: bool,
    },
    /// Append a message read from stdin to a mailbox
    Append { path: PathBuf },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a load error is reported once logging is up
    let (mut config, config_error) = config::load_config(cli.config.as_deref());

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
    }

    match cli.command {
        Commands::Validate { path, json } => cmd_validate(&path, json),
        Commands::Fix {
            path,
            inplace,
            out,
            dry_run,
            remove_deleted,
            quiet,
        } => cmd_fix(
            &path,
            &FixOptions {
                inplace,
                out,
                dry_run,
                remove_deleted,
                quiet,
            },
        ),
        Commands::Show { path, msg, json } => cmd_show(&path, msg, json),
        Commands::List { mailbox, json } => cmd_list(&config, &mailbox, json),
        Commands::View {
            mailbox,
            index,
            json,
        } => cmd_view(&config, &mailbox, index, json),
        Commands::Mark {
            mailbox,
            index,
            status,
            edit,
        } => {
            config.general.edit_mode |= edit;
            cmd_mark(&config, &mailbox, index, &status)
        }
        Commands::Append { path } => {
            if let Err(e) = cmd_append(&path) {
                eprintln!("mboxview: {e:#}");
                std::process::exit(EXIT_TEMPFAIL);
            }
            Ok(())
        }
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, config::LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Progress bar over messages, hidden for quiet or machine-readable runs.
fn message_progress(len: usize, label: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

fn read_mailbox(path: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    Ok(MboxParser::new(path)?.read_all()?)
}

/// Validate every message and print the findings.
fn cmd_validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let messages = read_mailbox(path)?;

    let pb = message_progress(messages.len(), "Validating", json);
    let mut results = Vec::new();
    for (i, raw) in messages.iter().enumerate() {
        results.extend(validate_message(raw, i));
        pb.inc(1);
    }
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_findings(&results);
    }
    Ok(())
}

struct FixOptions {
    inplace: bool,
    out: Option<PathBuf>,
    dry_run: bool,
    remove_deleted: bool,
    quiet: bool,
}

/// Normalize every message and write the result.
fn cmd_fix(path: &Path, opts: &FixOptions) -> anyhow::Result<()> {
    let mut messages = read_mailbox(path)?;

    let mut removed = 0;
    if opts.remove_deleted {
        (messages, removed) = remove_deleted(messages);
    }

    let pb = message_progress(messages.len(), "Fixing", opts.quiet);
    let mut results = Vec::new();
    let mut fixed = Vec::with_capacity(messages.len());
    for (i, raw) in messages.iter().enumerate() {
        let (message, findings) = normalize_message(raw, i);
        fixed.push(message);
        results.extend(findings);
        pb.inc(1);
    }
    pb.finish_and_clear();

    if !opts.quiet {
        print_findings(&results);
    }
    if opts.dry_run {
        return Ok(());
    }

    let target = if opts.inplace {
        Some(path.to_path_buf())
    } else {
        opts.out.clone()
    };

    match target {
        Some(target) => {
            let written = write_messages_atomic(&target, &fixed)?;
            if !opts.quiet {
                print_fix_summary(&target, fixed.len(), removed, written);
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            for message in &fixed {
                stdout.write_all(message)?;
            }
            stdout.flush()?;
        }
    }
    Ok(())
}

fn print_fix_summary(target: &Path, count: usize, removed: usize, written: u64) {
    use humansize::{format_size, BINARY};

    eprintln!();
    eprintln!("  Fix complete:");
    eprintln!("  {:<25} {}", "Messages written", count);
    eprintln!("  {:<25} {}", "Deleted removed", removed);
    eprintln!("  {:<25} {}", "Output size", format_size(written, BINARY));
    eprintln!("  {:<25} {}", "Output file", target.display());
    eprintln!();
}

fn print_findings(results: &[ValidationResult]) {
    if results.is_empty() {
        println!("No validation errors found.");
        return;
    }
    for result in results {
        println!("{result}");
    }
}

/// Print the header fields of one message.
fn cmd_show(path: &Path, index: usize, json: bool) -> anyhow::Result<()> {
    let messages = read_mailbox(path)?;
    let Some(raw) = messages.get(index) else {
        anyhow::bail!(
            "Invalid message index {index} (mailbox has {} messages)",
            messages.len()
        );
    };
    let headers = Message::split(raw).headers();

    if json {
        let output = serde_json::json!({
            "index": index,
            "fields": headers.fields(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Message {index}:");
    for field in headers.fields() {
        let mut values = field.values.iter();
        println!(
            "  {}: {}",
            field.name,
            values.next().map(String::as_str).unwrap_or_default()
        );
        for value in values {
            println!("  \t{value}");
        }
    }
    Ok(())
}

/// List the messages of a mailbox.
fn cmd_list(config: &Config, name: &Path, json: bool) -> anyhow::Result<()> {
    let mailbox = Mailbox::open(config, name)?;
    let summaries = mailbox.list_messages()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let from_width = config.display.from_width;
    let subject_width = config.display.subject_width;

    println!();
    println!("  {} message(s)", summaries.len());
    println!();
    if summaries.is_empty() {
        return Ok(());
    }

    println!(
        "  {:<5} {:<6} {:<17} {} {}",
        "#",
        "Status",
        "Date",
        pad("From", from_width),
        "Subject"
    );
    println!("  {}", "-".repeat(32 + from_width + subject_width));

    for summary in &summaries {
        let date = summary
            .parsed_timestamp
            .map(|ts| ts.format(&config.display.date_format).to_string())
            .unwrap_or_default();
        println!(
            "  {:<5} {:<6} {:<17} {} {}",
            summary.id,
            summary.status,
            date,
            pad(&truncate(&summary.from, from_width), from_width),
            truncate(&summary.subject, subject_width)
        );
    }
    println!();
    Ok(())
}

/// Cut `text` to at most `width` terminal columns.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Right-pad `text` with spaces to `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Print the decoded body of one message.
fn cmd_view(config: &Config, name: &Path, index: usize, json: bool) -> anyhow::Result<()> {
    let mailbox = Mailbox::open(config, name)?;
    let content = mailbox.get_content(index)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&content)?);
        return Ok(());
    }

    if !content.body_text.is_empty() {
        println!("{}", content.body_text);
    } else if let Some(html) = &content.body_html {
        println!("{html}");
    }
    if content.has_alternate {
        println!("[HTML alternative available, use --json to see it]");
    }
    for name in &content.attachments {
        println!("[Attachment: {name}]");
    }
    Ok(())
}

/// Set the Status header of one message.
fn cmd_mark(config: &Config, name: &Path, index: usize, status: &str) -> anyhow::Result<()> {
    let mailbox = Mailbox::open(config, name)?;
    let status = match status {
        "read" => STATUS_READ,
        "deleted" => STATUS_DELETED,
        other => other,
    };
    let updated = mailbox.update_status(index, status)?;
    let output = serde_json::json!({ "updated": updated });
    println!("{output}");
    Ok(())
}

/// Append a message from stdin.
fn cmd_append(path: &Path) -> anyhow::Result<()> {
    let stdin = std::io::stdin().lock();
    append_to_mbox(path, stdin)?;
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxview", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_pad_wide_chars() {
        assert_eq!(pad("日本", 6), "日本  ");
        assert_eq!(pad("toolong", 3), "toolong");
    }
}

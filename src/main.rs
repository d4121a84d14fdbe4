//! Tempo - template expansion for text buffers.
//!
//! # Usage
//!
//! ```bash
//! tempo --library snippets.json5 list
//! tempo --library snippets.json5 expand greet --answer World
//! tempo --library snippets.json5 expand bold --input page.html --region 10:24
//! tempo --library snippets.json5 complete --input main.c --scope c
//! ```

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use tempo::config::{
    ConfigFlags, SignalMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use tempo::editor::{Buffer, EditorBuffer};
use tempo::engine::{Completion, Engine};
use tempo::library::load_library;

/// Expand templates and complete tags in text files
#[derive(Parser, Debug)]
#[command(name = "tempo", version, about, long_about = None)]
struct Cli {
    /// Template library file (JSON5)
    #[arg(short, long, value_name = "FILE", global = true)]
    library: Option<PathBuf>,

    /// Ask for prompted points instead of leaving marks at them
    #[arg(short, long, global = true)]
    interactive: bool,

    /// Never signal failed or ambiguous completions
    #[arg(long, global = true)]
    silent: bool,

    /// Limit for nested template elements
    #[arg(long, value_name = "N", global = true)]
    max_depth: Option<usize>,

    /// How to signal failed or ambiguous completions
    #[arg(long, value_enum, global = true)]
    signal: Option<SignalMode>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a template by name
    Expand {
        /// Template name
        name: String,

        /// Wrap the region between two positions instead of inserting at point
        #[arg(long, value_name = "A:B", value_parser = parse_region)]
        region: Option<(usize, usize)>,

        #[command(flatten)]
        buffer: BufferArgs,
    },
    /// Complete the tag before point
    Complete {
        /// Scopes to install on the buffer, lowest priority first
        #[arg(long = "scope", value_name = "NAME")]
        scopes: Vec<String>,

        #[command(flatten)]
        buffer: BufferArgs,
    },
    /// List template names
    List,
}

#[derive(Args, Debug)]
struct BufferArgs {
    /// Text to edit; `-` reads stdin. Starts empty when absent
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Point as a character offset; end of text when absent
    #[arg(long, value_name = "POS")]
    at: Option<usize>,

    /// Answers for prompts, used in order
    #[arg(long = "answer", value_name = "TEXT")]
    answers: Vec<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<&'a str>,
    text: String,
    cursor: usize,
    marks: &'a [usize],
}

fn parse_region(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected A:B, got {s:?}"))?;
    let start = start
        .trim()
        .parse()
        .map_err(|err| format!("bad region start {start:?}: {err}"))?;
    let end = end
        .trim()
        .parse()
        .map_err(|err| format!("bad region end {end:?}: {err}"))?;
    Ok((start, end))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(String::new()),
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display())),
    }
}

/// End of text, before a final line break.
fn default_point(text: &str) -> usize {
    let trimmed = text
        .strip_suffix('\n')
        .map_or(text, |rest| rest.strip_suffix('\r').unwrap_or(rest));
    trimmed.chars().count()
}

fn stdin_prompter(prompt: &str) -> Option<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
    }
}

fn open_buffer(args: &BufferArgs, interactive: bool) -> Result<EditorBuffer> {
    let text = read_input(args.input.as_deref())?;
    let mut buffer = EditorBuffer::from_text(&text).with_answers(args.answers.iter().cloned());
    buffer.move_to(args.at.unwrap_or_else(|| default_point(&text)));
    if interactive {
        buffer.set_prompter(Box::new(stdin_prompter));
    }
    Ok(buffer)
}

fn signal(mode: SignalMode, dings: usize) {
    if dings == 0 {
        return;
    }
    match mode {
        SignalMode::Bell => eprint!("\x07"),
        SignalMode::Flash => eprintln!("[tempo] no completion"),
        SignalMode::Quiet => {}
    }
}

fn print_report(report: &Report<'_>, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to encode result")?;
        writeln!(stdout, "{out}")?;
    } else {
        write!(stdout, "{}", report.text)?;
    }
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let Some(command) = cli.command else {
        if cli.save || cli.clear {
            return Ok(());
        }
        anyhow::bail!("No command given (see --help)");
    };

    let library_path = effective
        .library
        .clone()
        .context("No template library given; pass --library FILE or save one with --save")?;
    let library = load_library(&library_path)?;
    let mut engine = Engine::with_settings(effective.settings());
    let installed = library
        .install(&mut engine)
        .with_context(|| format!("Failed to install library {}", library_path.display()))?;
    debug!(installed, library = %library_path.display(), "loaded template library");

    match command {
        Command::List => {
            let names = engine.registry().names();
            if effective.json {
                let out = serde_json::to_string_pretty(&names).context("Failed to encode names")?;
                println!("{out}");
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            Ok(())
        }
        Command::Expand {
            name,
            region,
            buffer: args,
        } => {
            let mut buffer = open_buffer(&args, effective.interactive)?;
            if let Some((start, end)) = region {
                buffer.move_to(start);
                buffer.set_mark(Some(end));
            }
            engine
                .insert_named(&mut buffer, &name, region.is_some())
                .with_context(|| format!("Failed to expand template {name}"))?;
            print_report(
                &Report {
                    outcome: "expanded",
                    tag: None,
                    prefix: None,
                    text: buffer.text(),
                    cursor: buffer.position(),
                    marks: engine.marks(buffer.id()),
                },
                effective.json,
            )
        }
        Command::Complete {
            scopes,
            buffer: args,
        } => {
            let mut buffer = open_buffer(&args, effective.interactive)?;
            for scope in &scopes {
                engine
                    .use_scope(buffer.id(), scope)
                    .with_context(|| format!("Cannot use scope {scope}"))?;
            }
            let completion = engine
                .complete_tag(&mut buffer, effective.silent)
                .context("Completion failed")?;
            signal(effective.signal_mode(), buffer.ding_count());
            let (outcome, tag, prefix) = match &completion {
                Completion::Expanded { tag, .. } => ("expanded", Some(tag.as_str()), None),
                Completion::Partial { prefix, .. } => ("partial", None, Some(prefix.as_str())),
                Completion::NoMatch => ("no-match", None, None),
            };
            print_report(
                &Report {
                    outcome,
                    tag,
                    prefix,
                    text: buffer.text(),
                    cursor: buffer.position(),
                    marks: engine.marks(buffer.id()),
                },
                effective.json,
            )
        }
    }
}

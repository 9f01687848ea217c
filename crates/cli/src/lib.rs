use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use command::{CommandAction, CommandRequest, CommandResponse};
use config::{BuildOverrides, EngineConfig};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

mod command;
mod config;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "simtree")]
#[command(about = "Similarity tree builder and filter-time reconnection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (overrides SIMTREE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Candidates attached directly to root
    #[arg(long, global = true)]
    primary_branches: Option<usize>,

    /// Fan-out cap for secondary placement
    #[arg(long, global = true)]
    max_children: Option<usize>,

    /// Neighbors examined per secondary item
    #[arg(long, global = true)]
    search_k: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON Command API request
    Command(CommandArgs),

    /// Build a similarity tree from a BuildRequest
    Build(PayloadArgs),

    /// Reconnect a tree after hiding nodes (ReconnectRequest)
    Reconnect(PayloadArgs),

    /// Check a node/edge set against the tree invariants
    Validate(PayloadArgs),

    /// Print JSON Schemas for every request and response
    Schema(PrettyArgs),
}

#[derive(Args)]
struct CommandArgs {
    /// Inline JSON request
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Read JSON request from file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct PayloadArgs {
    /// Request payload file (stdin when omitted)
    file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct PrettyArgs {
    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&BuildOverrides {
        primary_branches: cli.primary_branches,
        max_children_per_node: cli.max_children,
        secondary_search_k: cli.search_k,
    })?;

    match cli.command {
        Commands::Command(args) => {
            let raw = read_command(&args)?;
            let request: CommandRequest =
                serde_json::from_str(&raw).context("Invalid JSON passed to --json/--file")?;
            respond(request, &config, args.pretty)
        }
        Commands::Build(args) => run_action(CommandAction::Build, &args, &config),
        Commands::Reconnect(args) => run_action(CommandAction::Reconnect, &args, &config),
        Commands::Validate(args) => run_action(CommandAction::Validate, &args, &config),
        Commands::Schema(args) => {
            let request = CommandRequest {
                action: CommandAction::Schema,
                payload: Value::Null,
            };
            respond(request, &config, args.pretty)
        }
    }
}

fn run_action(action: CommandAction, args: &PayloadArgs, config: &EngineConfig) -> Result<()> {
    let raw = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None => read_stdin()?,
    };
    let payload: Value = serde_json::from_str(&raw).context("Payload is not valid JSON")?;
    respond(CommandRequest { action, payload }, config, args.pretty)
}

fn respond(request: CommandRequest, config: &EngineConfig, pretty: bool) -> Result<()> {
    let response = match command::execute(request, config) {
        Ok(resp) => resp,
        Err(err) => CommandResponse::error(format!("{err:#}")),
    };

    let output = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    print_stdout(&output)?;

    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn read_command(args: &CommandArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }
    read_stdin()
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        anyhow::bail!("Request is empty. Provide --json, --file, or pipe JSON via stdin.");
    }

    Ok(buffer)
}

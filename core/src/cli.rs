use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapter;
use crate::application::{Application, InitBuilder};
use crate::engine::{ArgumentPrompt, NoPrompt, Outcome};
use crate::instance::InstanceLock;
use crate::search::SearchQuery;
use crate::store::BackupTag;
use crate::tagging::AutoTagOptions;
use crate::types::{Category, Command};

#[derive(Parser)]
#[command(name = "commanddb")]
#[command(about = "CommandDB - store, search and run saved commands", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides config file and env vars)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored commands, optionally filtered
    List {
        /// Text matched against command, description, software and tags
        query: Option<String>,

        /// Only commands for this software
        #[arg(short = 's', long = "software")]
        software: Option<String>,

        /// Maximum number of results
        #[arg(short = 'l', long = "limit")]
        limit: Option<usize>,
    },

    /// Quick-add a command
    Add {
        #[arg(short = 'c', long = "command")]
        command: String,

        #[arg(short = 'd', long = "description", default_value = "")]
        description: String,

        #[arg(short = 's', long = "software", default_value = crate::types::DEFAULT_SOFTWARE)]
        software: String,

        /// Hotkey, CMD, PowerShell, Run Panel, Snippet or Workflow
        #[arg(short = 'k', long = "category", default_value = "Snippet")]
        category: String,

        /// Tags (comma-separated)
        #[arg(short = 't', long = "tags", value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Import a JSON array of commands, skipping duplicates
    Import {
        file: PathBuf,
    },

    /// Delete the command at INDEX
    Remove {
        index: usize,
    },

    /// Execute the command at INDEX
    Run {
        index: usize,

        /// Placeholder argument; prompted for when needed and absent
        #[arg(short = 'a', long = "arg")]
        arg: Option<String>,
    },

    /// Suggest tags from keyword rules
    Autotag {
        /// Only commands carrying this tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only commands for this software (repeatable)
        #[arg(long = "software")]
        software: Vec<String>,

        /// Keep the "import" tag on processed commands
        #[arg(long)]
        keep_import: bool,

        /// Save the changes instead of printing a preview
        #[arg(long)]
        apply: bool,
    },

    /// Run the engine daemon, reading JSON-line requests on stdin
    Serve,
}

/// Install the stderr log subscriber
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .try_init();
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments (for front-ends that need to filter args)
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

pub async fn run_cli_with_args(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);

    let builder = InitBuilder::new()
        .config_path(cli.config)
        .data_dir(cli.data_dir);

    match cli.command {
        Commands::List {
            query,
            software,
            limit,
        } => {
            let app = builder.init()?;
            let query = SearchQuery::new(query.unwrap_or_default())
                .software(software)
                .limit(limit);

            let hits = adapter::search_commands(&app, &query);
            if hits.is_empty() {
                println!("No commands found");
                return Ok(());
            }
            for (index, command) in hits {
                println!("{}", format_row(index, &command));
            }
        }

        Commands::Add {
            command,
            description,
            software,
            category,
            tags,
        } => {
            let app = builder.init()?;
            let record = Command::new(command, Category::from(category))
                .with_description(description)
                .with_software(software)
                .with_tags(tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()));

            let summary = adapter::add_command(&app, record)?;
            if summary.added == 1 {
                println!("✓ Command added");
            } else {
                println!("Command already stored (or blank); nothing added");
            }
        }

        Commands::Import { file } => {
            let app = builder.init()?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<Command> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of commands", file.display()))?;

            let summary = adapter::append_commands(&app, records, BackupTag::Import)?;
            println!("✓ Imported {} command(s), skipped {}", summary.added, summary.skipped);
        }

        Commands::Remove { index } => {
            let app = builder.init()?;
            let removed = adapter::remove_command(&app, index)?;
            println!("✓ Removed {}", format_row(index, &removed));
        }

        Commands::Run { index, arg } => {
            let app = builder.prompt(Arc::new(StdinPrompt)).init()?;
            tokio::task::spawn_blocking(move || run_one(&app, index, arg.as_deref())).await??;
        }

        Commands::Autotag {
            tags,
            software,
            keep_import,
            apply,
        } => {
            let app = builder.init()?;
            let options = AutoTagOptions {
                tags,
                software,
                remove_import: !keep_import,
            };

            let changes = if apply {
                adapter::apply_tags(&app, &options)?
            } else {
                adapter::preview_tags(&app, &options)
            };

            for change in &changes {
                println!(
                    "{:>4}  {}  +[{}] -[{}]",
                    change.index,
                    change.command,
                    change.added.join(", "),
                    change.removed.join(", ")
                );
            }
            match (apply, changes.len()) {
                (_, 0) => println!("No tag changes"),
                (true, n) => println!("✓ Updated {} command(s)", n),
                (false, n) => println!("{} command(s) would change; rerun with --apply to save", n),
            }
        }

        Commands::Serve => {
            let app = builder.prompt(Arc::new(NoPrompt)).init()?;
            serve(app).await?;
        }
    }

    Ok(())
}

fn format_row(index: usize, command: &Command) -> String {
    let mut row = format!(
        "{:>4}  [{}] {} | {}",
        index, command.category, command.software, command.command
    );
    if !command.description.is_empty() {
        row.push_str("  # ");
        row.push_str(&command.description);
    }
    row
}

fn run_one(app: &Application, index: usize, arg: Option<&str>) -> Result<()> {
    let records = adapter::load_commands(app);
    let command = records
        .get(index)
        .with_context(|| format!("No command at index {} ({} stored)", index, records.len()))?;

    match adapter::execute_command(app, command, arg)? {
        Outcome::Spawned(id) => {
            app.engine.wait_idle();
            println!("✓ Executed {}", id);
        }
        Outcome::Cancelled => println!("Cancelled"),
    }
    Ok(())
}

/// Asks on the terminal for a placeholder argument
struct StdinPrompt;

impl ArgumentPrompt for StdinPrompt {
    fn prompt(&self, command: &Command) -> Option<String> {
        eprint!("Argument for `{}`: ", command.command);
        io::stderr().flush().ok();

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/* ===================== Daemon ===================== */

/// One execution request read by `serve`
#[derive(Debug, Deserialize, PartialEq)]
pub struct ServeRequest {
    pub index: usize,
    #[serde(default)]
    pub arg: Option<String>,
}

/// Parse a request line; blank lines yield `None`
pub fn parse_request(line: &str) -> Result<Option<ServeRequest>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let request = serde_json::from_str(line).with_context(|| format!("Invalid request: {}", line))?;
    Ok(Some(request))
}

async fn serve(app: Application) -> Result<()> {
    let port = app.config.instance.port;
    let _guard = match InstanceLock::acquire(port).context("Failed to claim instance port")? {
        InstanceLock::Acquired(guard) => guard,
        InstanceLock::AlreadyRunning => {
            debug!(port, "Another instance is running; exiting");
            return Ok(());
        }
    };
    info!(port, "CommandDB engine started");

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable; serving until EOF");
            std::future::pending::<()>().await;
        }
    };
    let handled = serve_until(&app, stdin_lines(), interrupted).await?;

    info!(handled, "CommandDB engine stopped");
    Ok(())
}

/// Stdin lines, read on a detached thread
///
/// `tokio::io::stdin` parks an uncancellable read on the runtime's blocking
/// pool, which keeps the process alive after shutdown until the next line.
fn stdin_lines() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(64);
    let reader = std::thread::Builder::new()
        .name("commanddb-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = reader {
        warn!(error = %e, "Could not start stdin reader");
    }
    rx
}

/// Execute request lines until the channel closes or `shutdown` resolves
///
/// Returns how many requests were dispatched once running workers finished.
/// Bad requests are logged and skipped.
pub async fn serve_until<F>(
    app: &Application,
    mut requests: mpsc::Receiver<io::Result<String>>,
    shutdown: F,
) -> Result<usize>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut handled = 0;

    loop {
        tokio::select! {
            line = requests.recv() => match line {
                Some(line) => {
                    if handle_line(app, &line.context("Failed to read request")?) {
                        handled += 1;
                    }
                }
                None => {
                    info!(handled, "Request stream closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!(handled, "Interrupted");
                break;
            }
        }
    }

    let engine = app.engine.clone();
    tokio::task::spawn_blocking(move || engine.wait_idle()).await?;
    Ok(handled)
}

fn handle_line(app: &Application, line: &str) -> bool {
    let request = match parse_request(line) {
        Ok(Some(request)) => request,
        Ok(None) => return false,
        Err(e) => {
            warn!(error = %e, "Skipping request");
            return false;
        }
    };

    let records = adapter::load_commands(app);
    let Some(command) = records.get(request.index) else {
        warn!(index = request.index, stored = records.len(), "No command at index");
        return false;
    };

    match adapter::execute_command(app, command, request.arg.as_deref()) {
        Ok(outcome) => {
            debug!(index = request.index, ?outcome, "Request dispatched");
            true
        }
        Err(e) => {
            warn!(index = request.index, error = %e, "Request failed");
            false
        }
    }
}

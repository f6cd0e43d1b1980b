//! taskmirror CLI
//!
//! Command-line interface for taskmirror - a local mirror of your tasks.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskmirror_core::Config;

mod commands;
mod output;

use commands::task::{AddOptions, EditOptions};
use commands::Session;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "taskmirror")]
#[command(about = "taskmirror - Sync and edit your tasks from the terminal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync with the server
    Sync {
        /// Discard the local mirror and fetch everything
        #[arg(long)]
        full: bool,
    },
    /// Show status (server, sync token, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a new task
    #[command(alias = "create")]
    Add {
        /// Task content
        content: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Project ID or name (defaults to the inbox)
        #[arg(short, long)]
        project: Option<String>,
        /// Labels to add
        #[arg(short, long = "label")]
        labels: Vec<String>,
        /// Priority, p1 (urgent) to p4
        #[arg(short = 'P', long)]
        priority: Option<String>,
        /// Due date in natural language ("tomorrow", "every monday")
        #[arg(long)]
        due: Option<String>,
    },
    /// List open tasks
    #[command(alias = "ls")]
    List {
        /// Filter by project ID or name
        #[arg(short, long)]
        project: Option<String>,
        /// Filter by label
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Show task details
    Show {
        /// Task ID
        id: String,
    },
    /// Edit a task
    Edit {
        /// Task ID
        id: String,
        /// New content
        #[arg(long)]
        content: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// Replace the labels (repeat for several)
        #[arg(short, long = "label")]
        labels: Option<Vec<String>>,
        /// Priority, p1 (urgent) to p4
        #[arg(short = 'P', long)]
        priority: Option<String>,
        /// Due date in natural language
        #[arg(long)]
        due: Option<String>,
        /// All-day due date, YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        due_date: Option<String>,
        /// Due date and local time, "YYYY-MM-DD HH:MM"
        #[arg(long, value_name = "DATETIME")]
        due_time: Option<String>,
        /// Remove the due date
        #[arg(long)]
        no_due: bool,
    },
    /// Mark a task as done
    #[command(alias = "close")]
    Done {
        /// Task ID
        id: String,
    },
    /// Reopen a completed task
    #[command(alias = "reopen")]
    Undo {
        /// Task ID
        id: String,
    },
    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a new project
    Add {
        /// Project name
        name: String,
        /// Color name
        #[arg(short, long)]
        color: Option<String>,
    },
    /// List projects
    #[command(alias = "ls")]
    List,
    /// Rename a project
    Rename {
        /// Project ID or name
        project: String,
        /// New name
        name: String,
    },
    /// Archive a project
    Archive {
        /// Project ID or name
        project: String,
    },
}

#[derive(Subcommand)]
enum LabelCommands {
    /// Create a new label
    Add {
        /// Label name
        name: String,
        /// Color name
        #[arg(short, long)]
        color: Option<String>,
    },
    /// List labels
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (base_url, api_token, data_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    if let Ok(config) = Config::load_with_cli_override(config_path) {
        init_logging(&config);
    }

    // Commands that don't need a session
    match &cli.command {
        Commands::Config { command } => {
            return handle_config_command(command.clone(), config_path, &output);
        }
        Commands::Status => return commands::status::show(config_path, &output),
        _ => {}
    }

    let session = Session::open(config_path, &output)?;
    info!("Session opened against {}", session.config.base_url);

    let result = match cli.command {
        Commands::Sync { full } => commands::sync::sync(&session, full, &output).await,
        Commands::Task { command } => handle_task_command(command, &session, &output).await,
        Commands::Project { command } => {
            handle_project_command(command, &session, &output).await
        }
        Commands::Label { command } => handle_label_command(command, &session, &output).await,
        Commands::Config { .. } | Commands::Status => Ok(()), // Handled above
    };

    // Failed commands may still have synced
    session.save().await;
    result
}

async fn handle_task_command(
    command: TaskCommands,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        TaskCommands::Add {
            content,
            description,
            project,
            labels,
            priority,
            due,
        } => {
            let opts = AddOptions {
                content,
                description,
                project,
                labels,
                priority,
                due,
            };
            commands::task::add(session, opts, output).await
        }
        TaskCommands::List { project, label } => {
            commands::task::list(session, project, label, output).await
        }
        TaskCommands::Show { id } => commands::task::show(session, id, output).await,
        TaskCommands::Edit {
            id,
            content,
            description,
            labels,
            priority,
            due,
            due_date,
            due_time,
            no_due,
        } => {
            let opts = EditOptions {
                content,
                description,
                labels,
                priority,
                due,
                due_date,
                due_time,
                no_due,
            };
            commands::task::edit(session, id, opts, output).await
        }
        TaskCommands::Done { id } => commands::task::done(session, id, output).await,
        TaskCommands::Undo { id } => commands::task::undo(session, id, output).await,
        TaskCommands::Rm { id } => commands::task::delete(session, id, output).await,
    }
}

async fn handle_project_command(
    command: ProjectCommands,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        ProjectCommands::Add { name, color } => {
            commands::project::add(session, name, color, output).await
        }
        ProjectCommands::List => commands::project::list(session, output).await,
        ProjectCommands::Rename { project, name } => {
            commands::project::rename(session, project, name, output).await
        }
        ProjectCommands::Archive { project } => {
            commands::project::archive(session, project, output).await
        }
    }
}

async fn handle_label_command(
    command: LabelCommands,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        LabelCommands::Add { name, color } => {
            commands::label::add(session, name, color, output).await
        }
        LabelCommands::List => commands::label::list(session, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if TASKMIRROR_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("TASKMIRROR_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "taskmirror_core={},taskmirror={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}

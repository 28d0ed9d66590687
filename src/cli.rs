//! CLI module
//!
//! This module provides the command-line front end of the todotree tool.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use tokio::sync::oneshot;

use crate::{
    config::Config,
    decompose::Decomposer,
    manager::Core,
    models::{Task, TaskId},
    store::{resolve_storage_path, Store},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: Config,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the task tree
    List,

    /// Add a new top-level task
    Add {
        /// Task name
        name: String,
    },

    /// Add a task under an existing one
    #[command(name = "add-subtask")]
    AddSubtask {
        /// Id of the parent task
        parent: String,

        /// Task name
        name: String,
    },

    /// Toggle the completion flag of a task
    Toggle {
        /// Task id
        id: String,
    },

    /// Delete a task together with its subtasks
    Delete {
        /// Task id
        id: String,
    },

    /// Ask the language model to split a task into subtasks
    Decompose {
        /// Task id
        id: String,
    },

    /// Print the location of the task snapshot
    Path,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, bin_name, &mut io::stdout());
        return Ok(());
    }

    let path = resolve_storage_path(&cli.config.data_dir()?, cli.config.template().as_deref())?;
    if let Commands::Path = &cli.command {
        println!("{}", path.display());
        return Ok(());
    }

    let decomposer = Decomposer::with_http(cli.config.decomposer_config())?;
    let core = Core::open(Store::new(path), decomposer);

    match cli.command {
        Commands::List => {
            let tasks = core.get_all_tasks();
            if tasks.is_empty() {
                println!("No tasks yet. Add some with 'todotree add'");
            }
            for task in &tasks {
                print_task(task, 0);
            }
        }

        Commands::Add { name } => {
            let task = core.add_task(&name)?;
            println!("Added task: \"{}\" ({})", task.name(), task.id());
        }

        Commands::AddSubtask { parent, name } => {
            match core.add_subtask(&TaskId::new(parent.clone()), &name)? {
                Some(task) => println!(
                    "Added subtask: \"{}\" ({}) under {}",
                    task.name(),
                    task.id(),
                    parent
                ),
                None => return Err(format!("No task with id {}", parent).into()),
            }
        }

        Commands::Toggle { id } => {
            let id = TaskId::new(id);
            if !core.toggle_completion(&id)? {
                return Err(format!("No task with id {}", id).into());
            }
            if let Some(task) = core.find_task(&id) {
                print_task(&task, 0);
            }
        }

        Commands::Delete { id } => {
            if !core.delete_task(&TaskId::new(id.clone()))? {
                return Err(format!("No task with id {}", id).into());
            }
            println!("Deleted task {}", id);
        }

        Commands::Decompose { id } => {
            let id = TaskId::new(id);
            let (tx, rx) = oneshot::channel();
            core.decompose(&id, move |outcome| {
                let _ = tx.send(outcome);
            });

            let count = rx.await??;
            println!("Added {} subtasks", count);
            if let Some(task) = core.find_task(&id) {
                print_task(&task, 0);
            }
        }

        Commands::Path | Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Recursively prints a task and its subtasks with proper indentation
fn print_task(task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);

    let status = if task.is_completed() {
        "[x]".green()
    } else {
        "[ ]".normal()
    };

    println!(
        "{}{} {} {}",
        indent,
        status,
        task.name(),
        format!("({})", task.id()).dimmed()
    );

    for subtask in task.subtasks() {
        print_task(subtask, depth + 1);
    }
}

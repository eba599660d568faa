//! Command-line access to a project store.
//!
//! # Responsibility
//! - Provide a smoke probe for `projtrack_core` linkage.
//! - Export, import and summarize the projects held in a store file.

use clap::{Parser, Subcommand};
use projtrack_core::config::{DB_PATH_ENV, LOG_DIR_ENV};
use projtrack_core::db::open_db;
use projtrack_core::{
    init_logging_from, CoreConfig, ProjectStore, ProjectsManager, SqliteDocumentRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "projtrack")]
#[command(author, version, about = "Project and todo store tool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Store file (defaults to the temp directory)
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true, env = LOG_DIR_ENV)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print core ping and version
    Ping,
    /// List projects with cost and todo counts
    Summary {
        /// Only projects whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Write all projects as a JSON snapshot
    Export {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a JSON snapshot into the store
    Import {
        /// Snapshot file to read
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir;
    }
    init_logging_from(&config)?;

    if let Commands::Ping = cli.command {
        println!("projtrack_core ping={}", projtrack_core::ping());
        println!("projtrack_core version={}", projtrack_core::core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)?;
    let store = ProjectStore::new(SqliteDocumentRepository::try_new(&conn)?);
    let mut manager = ProjectsManager::new();
    let report = store.load_projects(&mut manager)?;
    for failure in &report.failures {
        eprintln!("skipped stored project {}: {}", failure.document_id, failure.error);
    }

    match cli.command {
        Commands::Ping => {}
        Commands::Summary { filter } => {
            let total_cost = manager.refresh_total_cost();
            let projects = manager.filter_projects(filter.as_deref().unwrap_or(""));
            for project in &projects {
                println!(
                    "{}  {:<24} {:<8} cost={:.2} progress={:.0}% todos={}",
                    project.id(),
                    project.name(),
                    project.status().as_str(),
                    project.cost(),
                    project.progress_percent(),
                    project.todos().len()
                );
            }
            println!("{} project(s), total cost {total_cost:.2}", projects.len());
        }
        Commands::Export { out } => match out {
            Some(path) => {
                manager.save_snapshot(&path)?;
                println!("exported {} project(s) to {}", manager.len(), path.display());
            }
            None => println!("{}", manager.export_snapshot_json()?),
        },
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let entries = ProjectsManager::parse_snapshot(&json)?;
            let report = store.import_snapshot(&mut manager, entries)?;
            for failure in &report.failures {
                eprintln!("record #{} `{}`: {}", failure.index, failure.name, failure.error);
            }
            for failure in &report.todo_failures {
                eprintln!(
                    "project {} todo #{} `{}`: {}",
                    failure.project_id, failure.index, failure.title, failure.error
                );
            }
            println!(
                "created {}, updated {}, rejected {}, todos dropped {}",
                report.created_count(),
                report.updated_count(),
                report.failures.len(),
                report.todo_failures.len()
            );
        }
    }
    Ok(())
}

//! Headless labelcheck entry point for inspecting and normalizing data files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use labelcheck::config::AppConfig;
use labelcheck::event::Event;
use labelcheck::ingest::discover_data_files;
use labelcheck::{Session, Stage};

#[derive(Parser)]
#[command(name = "labelcheck")]
#[command(about = "Inspect and normalize label-correction data files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files and print record counts, vocabularies and label counts
    Summary {
        /// Data files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Validate files without changing them
    Check {
        /// Data files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Load files and write them back with canonical headers
    Normalize {
        /// Data files to rewrite
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List data files found under a folder
    Discover {
        /// Folder to search recursively
        folder: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> AppConfig {
    match path {
        Some(path) => AppConfig::load_from(path).unwrap_or_else(|e| {
            eprintln!("Ignoring settings file {}: {}", path.display(), e);
            AppConfig::default()
        }),
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    }
}

fn init_logging(config: &AppConfig) {
    let level = config.preferences.log_level.to_level_filter();
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    env_logger::Builder::from_env(env).init();
}

/// Print queued warnings and errors; remember recent files in `config`.
fn drain_events(session: &Session, config: &mut AppConfig) -> bool {
    let mut remembered = false;
    for event in session.drain_events() {
        match event {
            Event::Error { kind, message } => eprintln!("{kind}: {message}"),
            Event::Warning { message } => eprintln!("warning: {message}"),
            Event::RecentFile { path, kind } => {
                config.recent.push(path, kind);
                remembered = true;
            }
            _ => {}
        }
    }
    remembered
}

fn print_summary(session: &mut Session) {
    let Some(set) = session.records() else {
        return;
    };
    println!("{} records in {} file(s)", set.len(), set.files().len());
    for file in set.files() {
        println!("  {} ({} records)", file.path.display(), file.uuids.len());
    }

    for &stage in Stage::all() {
        let labels = session.selectable_labels(stage);
        println!("{} labels: {}", stage, labels.join(", "));
    }

    println!("Confirmed classification labels:");
    for (label, count) in session.label_counts() {
        println!("  {label:<30} {count}");
    }
}

/// Load `files` and write them back; returns the number of files written.
fn normalize(session: &mut Session, files: &[PathBuf]) -> Option<usize> {
    session.load(files).ok()?;
    let written = session.save(true).ok()?;
    Some(written.map_or(0, |files| files.len()))
}

fn run(cli: Cli, config: &mut AppConfig) -> ExitCode {
    let mut session = Session::new(config.session_config());
    let settings = cli.config.as_deref();

    let code = match cli.command {
        Commands::Summary { files } => match session.load(&files) {
            Ok(_) => {
                print_summary(&mut session);
                ExitCode::SUCCESS
            }
            Err(_) => ExitCode::FAILURE,
        },

        Commands::Check { files } => match session.load(&files) {
            Ok(report) => {
                println!(
                    "OK: {} records in {} file(s), {} duplicate(s), {} missing UUID(s)",
                    report.records,
                    report.files,
                    report.duplicate_count(),
                    report.generated_uuids
                );
                ExitCode::SUCCESS
            }
            Err(_) => ExitCode::FAILURE,
        },

        Commands::Normalize { files } => match normalize(&mut session, &files) {
            Some(written) => {
                println!("Rewrote {} file(s)", written);
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },

        Commands::Discover { folder } => match discover_data_files(&folder) {
            Ok(found) => {
                for path in found {
                    println!("{}", path.display());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
    };

    if drain_events(&session, config) {
        let saved = match settings {
            Some(path) => config.save_to(path),
            None => config.save_to_default_path(),
        };
        if let Err(e) = saved {
            log::warn!("Failed to save settings: {}", e);
        }
    }
    code
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    init_logging(&config);
    run(cli, &mut config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_counts_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LabelChecker_a.csv");
        std::fs::write(&path, "Name,Id,Uuid\np1,1,\np2,2,\n").unwrap();
        let mut session = Session::default();

        let written = normalize(&mut session, &[path.clone(), path]);

        assert_eq!(written, Some(1));
    }

    #[test]
    fn test_normalize_fails_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LabelChecker_a.csv");
        std::fs::write(&path, "Name,Nonsense\nx,y\n").unwrap();
        let mut session = Session::default();

        assert_eq!(normalize(&mut session, &[path]), None);
    }
}

use std::path::PathBuf;

use clap::Parser;

/// Simple, file-backed personal task tracker.
/// Storage defaults to ./tasks.json or a path passed via --db.
#[derive(Parser, Debug)]
#[command(name = "taskcli", version, about = "Interactive personal task manager")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, default_value = "tasks.json")]
    pub db: PathBuf,

    /// Log store activity at debug level on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

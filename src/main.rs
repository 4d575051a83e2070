//! # taskcli - Personal Task Manager
//!
//! A small interactive task tracker for the terminal. Tasks are added,
//! listed, completed, and deleted from a numbered menu and kept in a local
//! JSON file between runs.
//!
//! ```bash
//! # Use ./tasks.json
//! taskcli
//!
//! # Keep tasks somewhere else, with debug logging on stderr
//! taskcli --db ~/notes/tasks.json --verbose
//! ```
//!
//! The file holds `{ "next_id": n, "tasks": [...] }`. Ids are never reused,
//! so a deleted task's id stays retired.

use std::io::{self, BufWriter};

use clap::Parser;
use crossterm::tty::IsTty;
use tracing::debug;

pub mod cli;
pub mod error;
pub mod fields;
pub mod logging;
pub mod shell;
pub mod store;
pub mod task;

use cli::Cli;
use shell::Shell;
use store::TaskStore;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let (mut store, outcome) = TaskStore::open(&cli.db);
    debug!(tasks = store.len(), next_id = store.next_id(), "task store ready");

    let stdout = io::stdout();
    let color = stdout.is_tty();
    let mut shell = Shell::new(&mut store, io::stdin().lock(), BufWriter::new(stdout.lock()))
        .with_color(color);

    if let Err(e) = shell.welcome(&outcome).and_then(|_| shell.run()) {
        eprintln!("Console error: {e}");
        std::process::exit(1);
    }
}

//! Interactive text menu over the task store.
//!
//! The shell reads one line per prompt from any `BufRead` and writes to any
//! `Write`, so it runs the same against a terminal or an in-memory buffer.
//! Bad input is reported and asked for again; it never ends the loop.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crossterm::style::{Color, Stylize};
use thiserror::Error;

use crate::error::StoreError;
use crate::fields::{format_status, Status};
use crate::store::{Completion, LoadOutcome, TaskStore};

/// Entries of the main menu, numbered 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    View,
    Complete,
    Delete,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        MenuChoice::Add,
        MenuChoice::View,
        MenuChoice::Complete,
        MenuChoice::Delete,
        MenuChoice::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Add => "Add Task",
            MenuChoice::View => "View Tasks",
            MenuChoice::Complete => "Complete Task",
            MenuChoice::Delete => "Delete Task",
            MenuChoice::Exit => "Exit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("Please enter a valid number.")]
    NotANumber,
    #[error("Please enter a number between 1 and 5.")]
    OutOfRange,
}

impl FromStr for MenuChoice {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: usize = s.trim().parse().map_err(|_| ChoiceError::NotANumber)?;
        n.checked_sub(1)
            .and_then(|i| MenuChoice::ALL.get(i).copied())
            .ok_or(ChoiceError::OutOfRange)
    }
}

const WIDE_RULE: usize = 50;
const NARROW_RULE: usize = 30;

pub struct Shell<'a, R, W> {
    store: &'a mut TaskStore,
    input: R,
    output: W,
    color: bool,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(store: &'a mut TaskStore, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
            color: false,
        }
    }

    /// Colour status markers and headings. Only worth enabling on a terminal.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Print what happened while opening the task file.
    pub fn welcome(&mut self, outcome: &LoadOutcome) -> io::Result<()> {
        let path = self.store.path().display().to_string();
        match outcome {
            LoadOutcome::Fresh => writeln!(self.output, "No existing task file found. Starting fresh!")?,
            LoadOutcome::Loaded(n) => writeln!(self.output, "Loaded {} tasks from {}", n, path)?,
            LoadOutcome::Recovered { error, backup } => {
                let label = self.paint("Error loading tasks:", Color::Red);
                writeln!(self.output, "{} {}", label, error)?;
                if let Some(backup) = backup {
                    writeln!(self.output, "The unreadable file was copied to {}", backup.display())?;
                }
                writeln!(self.output, "Starting with empty task list.")?;
            }
        }
        let title = self.paint("Welcome to Personal Task Manager!", Color::Cyan);
        writeln!(self.output, "{}", title)
    }

    /// Serve the menu until Exit is chosen or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.print_menu()?;
            let Some(line) = self.prompt("Enter your choice (1-5): ")? else {
                break;
            };
            let choice = match line.parse::<MenuChoice>() {
                Ok(choice) => choice,
                Err(e) => {
                    writeln!(self.output, "{}", e)?;
                    continue;
                }
            };

            let keep_going = match choice {
                MenuChoice::Add => self.add_task()?,
                MenuChoice::View => {
                    self.view_tasks()?;
                    true
                }
                MenuChoice::Complete => self.complete_task()?,
                MenuChoice::Delete => self.delete_task()?,
                MenuChoice::Exit => break,
            };
            if !keep_going || self.prompt("\nPress Enter to continue...")?.is_none() {
                break;
            }
        }
        writeln!(self.output, "Thank you for using Personal Task Manager!")?;
        self.output.flush()
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n{}", "=".repeat(NARROW_RULE))?;
        let title = self.paint("PERSONAL TASK MANAGER", Color::Cyan);
        writeln!(self.output, "{}", title)?;
        writeln!(self.output, "{}", "=".repeat(NARROW_RULE))?;
        for (i, choice) in MenuChoice::ALL.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, choice.label())?;
        }
        writeln!(self.output, "{}", "-".repeat(NARROW_RULE))
    }

    /// Print `message` and read one line. `None` means input has ended.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Ask for a task id until a number is given. A blank line cancels.
    fn prompt_id(&mut self, action: &str) -> io::Result<Option<Option<u64>>> {
        loop {
            let Some(line) = self.prompt(&format!("Enter task ID to {}: ", action))? else {
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                writeln!(self.output, "Cancelled.")?;
                return Ok(Some(None));
            }
            match line.parse::<u64>() {
                Ok(id) => return Ok(Some(Some(id))),
                Err(_) => writeln!(self.output, "Please enter a valid task ID number.")?,
            }
        }
    }

    fn report_error(&mut self, err: &StoreError) -> io::Result<()> {
        let label = if err.is_storage() { "Storage error:" } else { "Error:" };
        let label = self.paint(label, Color::Red);
        writeln!(self.output, "{} {}!", label, err)
    }

    fn report_save_failure(&mut self) -> io::Result<()> {
        if let Some(err) = self.store.take_save_error() {
            let label = self.paint("Error saving tasks:", Color::Red);
            writeln!(self.output, "{} {}", label, err)?;
            writeln!(self.output, "The change is kept for this session only.")?;
        }
        Ok(())
    }

    fn add_task(&mut self) -> io::Result<bool> {
        let Some(description) = self.prompt("Enter task description: ")? else {
            return Ok(false);
        };
        match self.store.add(&description) {
            Ok(task) => {
                writeln!(self.output, "Task '{}' added successfully with ID {}!", task.description, task.id)?;
                self.report_save_failure()?;
            }
            Err(e) => self.report_error(&e)?,
        }
        Ok(true)
    }

    fn view_tasks(&mut self) -> io::Result<()> {
        if self.store.is_empty() {
            return writeln!(self.output, "No tasks found!");
        }
        writeln!(self.output, "\n{}", "=".repeat(WIDE_RULE))?;
        let title = self.paint("YOUR TASKS", Color::Cyan);
        writeln!(self.output, "{}", title)?;
        writeln!(self.output, "{}", "=".repeat(WIDE_RULE))?;

        let mut rows = Vec::with_capacity(self.store.len());
        for task in self.store.list() {
            let marker = match task.status {
                Status::Completed => self.paint("✓", Color::Green),
                Status::Pending => self.paint("○", Color::Yellow),
            };
            rows.push(format!(
                "{} [{}] {}\n    Created: {}\n    Status: {}\n{}",
                marker,
                task.id,
                task.description,
                task.created_date,
                format_status(task.status),
                "-".repeat(NARROW_RULE),
            ));
        }
        for row in rows {
            writeln!(self.output, "{}", row)?;
        }

        let done = self.store.list().iter().filter(|t| t.is_completed()).count();
        writeln!(
            self.output,
            "{} pending, {} completed",
            self.store.len() - done,
            done
        )
    }

    fn complete_task(&mut self) -> io::Result<bool> {
        let Some(id) = self.prompt_id("complete")? else {
            return Ok(false);
        };
        let Some(id) = id else { return Ok(true) };
        match self.store.complete(id) {
            Ok(Completion::Completed(task)) => {
                writeln!(self.output, "Task '{}' marked as completed!", task.description)?;
                self.report_save_failure()?;
            }
            Ok(Completion::AlreadyCompleted(task)) => {
                writeln!(self.output, "Task '{}' is already completed!", task.description)?;
            }
            Err(e) => self.report_error(&e)?,
        }
        Ok(true)
    }

    fn delete_task(&mut self) -> io::Result<bool> {
        let Some(id) = self.prompt_id("delete")? else {
            return Ok(false);
        };
        let Some(id) = id else { return Ok(true) };
        match self.store.delete(id) {
            Ok(task) => {
                writeln!(self.output, "Task '{}' deleted successfully!", task.description)?;
                self.report_save_failure()?;
            }
            Err(e) => self.report_error(&e)?,
        }
        Ok(true)
    }
}

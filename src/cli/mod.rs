//! Command-line interface definitions.
//!
//! The same [`Command`] enum drives one-shot invocations and the lines typed
//! into the interactive shell.

use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Password manager with client-side envelope encryption
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION, version, long_about = None)]
pub struct CliArgs {
    /// Log output format
    #[arg(long, global = true, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON])]
    pub log_format: Option<String>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Vault commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and log in (prompts for a new master password)
    Register {
        /// Account name on the vault server
        username: String,
    },

    /// Log in and unlock the vault (prompts for the master password)
    Login {
        /// Account name on the vault server
        username: String,
    },

    /// Lock the vault and forget the master password
    Logout,

    /// List entries, newest first
    List {
        /// Only show entries whose service or username contains this text
        #[arg(short, long)]
        query: Option<String>,

        /// Show secrets instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Add an entry
    Add(EntryArgs),

    /// Replace an existing entry
    Update {
        /// Entry id as shown by `list`
        id: i64,

        #[command(flatten)]
        entry: EntryArgs,
    },

    /// Delete an entry
    Delete {
        /// Entry id as shown by `list`
        id: i64,
    },

    /// Write every secret in plaintext to a JSON file
    Export {
        /// Output file (defaults to wreckvault-export-YYYY-MM-DD.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the plaintext confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Add entries from a JSON export file
    Import {
        /// File containing a JSON array of entries
        path: PathBuf,
    },

    /// Set the inactivity auto-lock window in minutes (0 = never)
    AutoLock {
        /// One of 0, 1, 5, 15, 60
        minutes: u64,
    },

    /// Show login state and auto-lock settings
    Status,

    /// Start an interactive session
    Shell,
}

/// Fields of an entry to add or update.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct EntryArgs {
    /// Service name (e.g., "GitHub")
    #[arg(short, long)]
    pub service: String,

    /// Account username for the service
    #[arg(short, long, default_value = "")]
    pub username: String,

    /// Website URL
    #[arg(short, long)]
    pub website: Option<String>,

    /// Secret to store; prompted for when omitted. Visible to other local
    /// users in the process list.
    #[arg(long)]
    pub secret: Option<String>,
}

/// One line typed into the interactive shell.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true, name = APP_NAME)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

impl ShellLine {
    /// Parse an already-split shell line.
    pub fn parse_words(words: &[String]) -> Result<Command, clap::Error> {
        ShellLine::try_parse_from(words).map(|line| line.command)
    }
}

/// Split a shell line into words.
///
/// Whitespace separates words. Single quotes keep their content verbatim;
/// double quotes group words and allow `\"` and `\\` escapes. A backslash
/// outside quotes escapes the next character.
///
/// # Errors
///
/// Returns a message for an unterminated quote or trailing backslash.
pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(c) => current.push(c),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}
